// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Admin impersonation.
//!
//! Starting an impersonation stashes the admin's own session, mints a
//! session for the target through a magic link, and redirects the browser
//! through the auth callback with the target's tokens. Stopping reads the
//! stash back and re-establishes the admin's session.
//!
//! - [`envelope`]: the stashed session's wire format.
//! - [`extractor`]: pulls a token pair out of a generated link.
//! - [`stash`]: where the envelope lives between start and stop.
//! - [`machine`]: the start flow as explicit states.
//! - [`service`]: start, stop and state, with locking, audit and timeouts.

pub mod envelope;
pub mod error;
pub mod extractor;
pub mod machine;
pub mod service;
pub mod stash;

pub use envelope::{decode, encode, DecodeError};
pub use error::{ErrorKind, ImpersonationError, Stage};
pub use extractor::{extract_tokens, ExtractionError, Strategy, STRATEGIES};
pub use machine::{StartContext, StartRequest, State};
pub use service::{ImpersonationService, ImpersonationState, Redirect, Stopped};
pub use stash::{MemoryStash, SessionStash, StashError};
