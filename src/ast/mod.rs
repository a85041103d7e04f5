//! Abstract Syntax Tree (AST) Types for drun
//!
//! This module defines the AST structure the external parser produces and
//! the execution engine consumes.

pub mod types;
