// Copyright 2026 Paul Adamson
// Licensed under the Apache License, Version 2.0
//
// Protocol layer - commands, notification descriptors and the objects built on them
//
// Architecture:
// - Domain modules (page, runtime, target, emulation) hold command constructors,
//   result schemas and notification descriptors
// - EventCatalogue maps notification method names to their identity descriptors
// - Browser and Tab wrap sessions with discovery and page conveniences

pub mod browser;
pub mod command;
pub mod emulation;
pub mod notification;
pub mod page;
pub mod runtime;
pub mod schema;
pub mod tab;
pub mod target;

pub use browser::Browser;
pub use command::Command;
pub use notification::{EventCatalogue, IdentityField, NotificationType};
pub use schema::{FieldKind, FieldSpec, Schema};
pub use tab::Tab;
