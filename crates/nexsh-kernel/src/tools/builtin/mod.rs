//! Stock builtin commands.
//!
//! Each builtin lives in its own file with its own tests. They all go
//! through [`register_builtins`], which the engine calls at startup;
//! embedders can shadow any of them afterwards since registration is
//! last-wins.

mod cat;
mod cd;
mod cp;
mod exit;
mod help;
mod kill;
mod ls;
mod mkdir;
mod mv;
mod ps;
mod pwd;
mod rm;

use std::sync::Arc;

use super::registry::BuiltinRegistry;

pub fn register_builtins(registry: &Arc<BuiltinRegistry>) {
    registry.register(Arc::new(ls::Ls));
    registry.register(Arc::new(cd::Cd));
    registry.register(Arc::new(pwd::Pwd));
    registry.register(Arc::new(mkdir::Mkdir));
    registry.register(Arc::new(rm::Rm));
    registry.register(Arc::new(cp::Cp));
    registry.register(Arc::new(mv::Mv));
    registry.register(Arc::new(cat::Cat));
    registry.register(Arc::new(ps::Ps));
    registry.register(Arc::new(kill::Kill));
    registry.register(Arc::new(help::Help::new(registry)));
    registry.register(Arc::new(exit::Exit));
}
