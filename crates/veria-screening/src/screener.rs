//! The seam between a screening session and whatever produces verdicts.
//!
//! A session never talks to the remote service directly. In a backend process
//! the screener is the in-process credential boundary; in a UI-facing client
//! it is an HTTP client for the boundary's `/api/screen` route.

use crate::error::ScreeningError;
use crate::types::{Address, ScreeningVerdict};
use std::future::Future;
use std::sync::Arc;

pub trait Screener {
    /// Screens one address. Implementations perform at most one upstream
    /// request per call and never retry internally.
    fn screen(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<ScreeningVerdict, ScreeningError>> + Send;
}

impl<T: Screener> Screener for Arc<T> {
    fn screen(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<ScreeningVerdict, ScreeningError>> + Send {
        self.as_ref().screen(address)
    }
}
