// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-server — HTTP surface for the Pagewerk page toolkit.

pub mod error;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;
pub mod sweeper;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;
