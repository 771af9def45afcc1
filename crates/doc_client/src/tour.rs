//! Deciding whether to start an onboarding tour, and keeping two from starting at once.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::cursor::UrlState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourKind {
    Welcome,
    /// A tour defined by the document itself. `auto_started` tours are marked as seen when done.
    Doc { auto_started: bool },
}

/// User and environment facts the tour decision depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourPrefs {
    pub doc_id: String,
    /// Explicit "show welcome tour" preference, if the user ever set one.
    #[serde(default)]
    pub show_grist_tour: Option<bool>,
    #[serde(default)]
    pub seen_doc_tours: Vec<String>,
    #[serde(default)]
    pub personal_org_owner: bool,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub readonly: bool,
    /// Tours are not laid out for narrow screens.
    #[serde(default)]
    pub narrow_screen: bool,
}

fn should_auto_start_welcome_tour(has_doc_tour: bool, prefs: &TourPrefs) -> bool {
    // A doc tour takes precedence; the welcome tour waits for another document.
    if has_doc_tour {
        return false;
    }
    if !prefs.personal_org_owner || prefs.readonly {
        return false;
    }
    prefs.show_grist_tour.unwrap_or(prefs.anonymous)
}

pub fn plan_tour(state: &UrlState, has_doc_tour: bool, prefs: &TourPrefs) -> Option<TourKind> {
    if prefs.narrow_screen {
        return None;
    }
    let auto_doc_tour = has_doc_tour && !prefs.seen_doc_tours.contains(&prefs.doc_id);
    if state.doc_tour || auto_doc_tour {
        return Some(TourKind::Doc {
            auto_started: auto_doc_tour,
        });
    }
    if state.welcome_tour || should_auto_start_welcome_tour(has_doc_tour, prefs) {
        return Some(TourKind::Welcome);
    }
    None
}

/// Flag set while a tour is being started.
#[derive(Debug, Default)]
pub struct TourGate {
    starting: AtomicBool,
}

pub struct TourGateGuard<'a> {
    gate: &'a TourGate,
}

impl TourGate {
    /// Claims the gate, or `None` if another start is in progress.
    pub fn try_begin(&self) -> Option<TourGateGuard<'_>> {
        self.starting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TourGateGuard { gate: self })
    }

    pub fn is_starting(&self) -> bool {
        self.starting.load(Ordering::Acquire)
    }
}

impl Drop for TourGateGuard<'_> {
    fn drop(&mut self) {
        self.gate.starting.store(false, Ordering::Release);
    }
}

#[async_trait]
pub trait TourLauncher: Send + Sync {
    fn is_tour_active(&self) -> bool;
    /// Runs the welcome tour; the launcher records that it was shown.
    async fn start_welcome_tour(&self) -> Result<()>;
    /// Runs the document's own tour until the user finishes it.
    async fn start_doc_tour(&self) -> Result<()>;
    async fn mark_doc_tour_seen(&self, doc_id: &str) -> Result<()>;
}

pub struct NoTourLauncher;

#[async_trait]
impl TourLauncher for NoTourLauncher {
    fn is_tour_active(&self) -> bool {
        false
    }

    async fn start_welcome_tour(&self) -> Result<()> {
        Ok(())
    }

    async fn start_doc_tour(&self) -> Result<()> {
        Ok(())
    }

    async fn mark_doc_tour_seen(&self, _doc_id: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/tour_tests.rs"]
mod tests;
