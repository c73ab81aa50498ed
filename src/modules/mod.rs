//! Module System Infrastructure
//!
//! This module provides the module-system side of depswap:
//! - `ModuleId` / `ModuleRecord` / `ParentContext` - Identities, cached records, load edges
//! - `ModuleRegistry` - Shared identity → record cache
//! - `RegistryAdapter` - The single write path into a registry
//! - `AliasTable` - Token → directory rewriting consulted before resolution
//! - `Resolver` / `FsResolver` - Request → identity resolution
//! - `ModuleLoader` / `ModuleHost` - Execute-or-return-cached loading

mod adapter;
mod alias;
mod host;
mod record;
mod registry;
mod resolver;

pub use adapter::RegistryAdapter;
pub use alias::{global_aliases, new_shared_aliases, AliasTable, SharedAliasTable};
pub use host::{ModuleBody, ModuleHost, ModuleLoader, ModuleScope};
pub use record::{ModuleId, ModuleRecord, ParentContext};
pub use registry::{global_registry, new_shared_registry, ModuleRegistry, SharedModuleRegistry};
pub use resolver::{FileResolver, FsResolver, ResolveOptions, Resolver};
