use anyhow::Result;
use std::collections::HashMap;

use crate::canonical::{canonicalize, fallback_prefix, has_qualifier};
use crate::observer::ResourceObserver;
use crate::resource::{ExpectedLoadState, ObservedLoadState, TrackedResource};
use crate::verify::{Mismatch, Rekey, UnresolvedReason, UnresolvedResource, VerificationResult};
use crate::wait::{wait_until, WaitOptions};

/// Expected stub/loaded state of every document tab a scenario opened.
///
/// Entries keep registration order. `index` maps each canonical identity to
/// the positions of all entries sharing it, in ascending order, so focus
/// events touch exactly the colliding views.
#[derive(Debug, Clone, Default)]
pub struct LazyLoadStateTracker {
    entries: Vec<TrackedResource>,
    index: HashMap<String, Vec<usize>>,
}

impl LazyLoadStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a tracker from a saved snapshot, keeping each entry's flag.
    pub fn from_resources<I>(resources: I) -> Self
    where
        I: IntoIterator<Item = TrackedResource>,
    {
        let mut tracker = Self::new();
        for res in resources {
            tracker.push(res);
        }
        tracker
    }

    /// Track a newly opened document as a stub. Duplicate captions are kept
    /// as separate entries.
    pub fn register(&mut self, identity: impl Into<String>, group: impl Into<String>) {
        let res = TrackedResource::new(identity, group);
        log::debug!("📄 Tracking '{}' ({})", res.identity, res.group);
        self.push(res);
    }

    fn push(&mut self, res: TrackedResource) {
        let pos = self.entries.len();
        self.index
            .entry(res.canonical_identity().to_string())
            .or_default()
            .push(pos);
        self.entries.push(res);
    }

    /// Record that the window captioned `raw_identity` received focus.
    ///
    /// Every entry with the same canonical identity is expected loaded from
    /// now on: focusing one view of a file loads its designer and code views
    /// together. Unknown captions are ignored. Returns how many entries
    /// changed expectation or already expected loaded.
    pub fn mark_focused(&mut self, raw_identity: &str) -> usize {
        let canonical = canonicalize(raw_identity);
        let Some(positions) = self.index.get(canonical) else {
            log::debug!("Focus on untracked '{}' ignored", raw_identity);
            return 0;
        };

        for &pos in positions {
            self.entries[pos].is_stub = false;
        }
        log::debug!(
            "🎯 Focused '{}': {} tracked view(s) expected loaded",
            raw_identity,
            positions.len()
        );
        positions.len()
    }

    /// Expect every tracked document to be a stub again, e.g. before the
    /// solution is reopened.
    pub fn reset_all_to_stub(&mut self) {
        for res in &mut self.entries {
            res.is_stub = true;
        }
    }

    pub fn resources(&self) -> &[TrackedResource] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose caption is exactly `identity`.
    pub fn get(&self, identity: &str) -> Option<&TrackedResource> {
        self.entries.iter().find(|res| res.identity == identity)
    }

    /// Entries sharing the canonical identity of `raw_identity`.
    pub fn views_of<'a>(
        &'a self,
        raw_identity: &str,
    ) -> impl Iterator<Item = &'a TrackedResource> + 'a {
        self.index
            .get(canonicalize(raw_identity))
            .into_iter()
            .flatten()
            .map(move |&pos| &self.entries[pos])
    }

    /// Compare every entry against what `observer` reports.
    ///
    /// Entries expected loaded but observed as stubs are re-polled until
    /// `wait.timeout`, since materialization lags the focus event. An entry
    /// the host no longer shows is looked up again by caption prefix when
    /// its caption has a bracketed qualifier; on success the entry takes the
    /// new caption. Anything else not found is fatal and returned as an
    /// [`UnresolvedResource`] error.
    pub fn verify_against<O>(
        &mut self,
        observer: &mut O,
        wait: WaitOptions,
    ) -> Result<VerificationResult>
    where
        O: ResourceObserver + ?Sized,
    {
        let mut result = VerificationResult::default();

        for pos in 0..self.entries.len() {
            let mut observed = observer.observe(&self.entries[pos].identity);
            if observed == ObservedLoadState::NotFound {
                observed = self.resolve_missing(pos, observer, &mut result)?;
            }

            let res = &self.entries[pos];
            let expected = res.expected();
            if expected == ExpectedLoadState::Loaded && observed != ObservedLoadState::Loaded {
                let identity = res.identity.as_str();
                wait_until(wait, || {
                    observed = observer.observe(identity);
                    observed == ObservedLoadState::Loaded
                });
            }

            result.checked += 1;
            if expected.matches(observed) {
                log::debug!("✅ '{}' is {}", res.identity, observed);
            } else {
                let mismatch = Mismatch {
                    identity: res.identity.clone(),
                    group: res.group.clone(),
                    expected,
                    observed,
                };
                log::warn!("❌ {}", mismatch);
                result.failures.push(mismatch);
            }
        }

        Ok(result)
    }

    /// Find the window a not-found entry was re-captioned to and observe it.
    fn resolve_missing<O>(
        &mut self,
        pos: usize,
        observer: &mut O,
        result: &mut VerificationResult,
    ) -> Result<ObservedLoadState, UnresolvedResource>
    where
        O: ResourceObserver + ?Sized,
    {
        let identity = self.entries[pos].identity.clone();
        let unresolved = |reason| UnresolvedResource {
            identity: identity.clone(),
            reason,
        };

        if !has_qualifier(&identity) {
            return Err(unresolved(UnresolvedReason::NoQualifier));
        }

        let prefix = fallback_prefix(&identity);
        let candidates: Vec<String> = observer
            .observable_names()
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .collect();
        // Prefer a window no other entry already claims.
        let chosen = candidates
            .iter()
            .find(|name| self.get(name).is_none())
            .or_else(|| candidates.first())
            .cloned()
            .ok_or_else(|| unresolved(UnresolvedReason::NoCandidate))?;

        // The entry keeps its caption unless the candidate is really there.
        let observed = observer.observe(&chosen);
        if observed == ObservedLoadState::NotFound {
            return Err(unresolved(UnresolvedReason::CandidateVanished));
        }

        log::info!("🔁 '{}' re-captioned as '{}'", identity, chosen);
        self.rekey(pos, chosen.clone());
        result.rekeyed.push(Rekey {
            from: identity.clone(),
            to: chosen,
        });
        Ok(observed)
    }

    fn rekey(&mut self, pos: usize, identity: String) {
        let old = self.entries[pos].canonical_identity().to_string();
        if let Some(positions) = self.index.get_mut(&old) {
            positions.retain(|&p| p != pos);
            if positions.is_empty() {
                self.index.remove(&old);
            }
        }

        self.entries[pos].identity = identity;
        let positions = self
            .index
            .entry(self.entries[pos].canonical_identity().to_string())
            .or_default();
        if let Err(at) = positions.binary_search(&pos) {
            positions.insert(at, pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Scripted host: each caption yields its queued states in turn, then
    /// repeats the last one.
    #[derive(Default)]
    struct ScriptedObserver {
        states: HashMap<String, Vec<ObservedLoadState>>,
        names: Vec<String>,
        polls: HashMap<String, usize>,
    }

    impl ScriptedObserver {
        fn with(mut self, caption: &str, states: &[ObservedLoadState]) -> Self {
            self.states.insert(caption.to_string(), states.to_vec());
            if !states.contains(&ObservedLoadState::NotFound) {
                self.names.push(caption.to_string());
            }
            self
        }

        /// Listed by `observable_names` whatever `observe` reports.
        fn listed(mut self, caption: &str, states: &[ObservedLoadState]) -> Self {
            self.states.insert(caption.to_string(), states.to_vec());
            self.names.push(caption.to_string());
            self
        }

        fn polls(&self, caption: &str) -> usize {
            self.polls.get(caption).copied().unwrap_or(0)
        }
    }

    impl ResourceObserver for ScriptedObserver {
        fn observe(&mut self, identity: &str) -> ObservedLoadState {
            let count = self.polls.entry(identity.to_string()).or_default();
            *count += 1;
            match self.states.get(identity) {
                Some(states) if !states.is_empty() => {
                    states[(*count - 1).min(states.len() - 1)]
                }
                _ => ObservedLoadState::NotFound,
            }
        }

        fn observable_names(&mut self) -> Vec<String> {
            self.names.clone()
        }
    }

    use ObservedLoadState::{Loaded, NotFound, Stub};

    fn fast_wait() -> WaitOptions {
        WaitOptions::from_millis(1_000, 1)
    }

    #[test]
    fn test_register_preserves_duplicates_and_order() {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("Form1.cs", "ProjA");
        tracker.register("Form1.cs", "ProjA");
        tracker.register("Program.cs", "ProjB");

        assert_eq!(tracker.len(), 3);
        let captions: Vec<_> = tracker
            .resources()
            .iter()
            .map(|r| r.identity.as_str())
            .collect();
        assert_eq!(captions, vec!["Form1.cs", "Form1.cs", "Program.cs"]);
        assert!(tracker.resources().iter().all(|r| r.is_stub));
    }

    #[test]
    fn test_focus_updates_all_colliding_views() {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("Form1.cs", "ProjA");
        tracker.register("Form1.cs [Design]", "ProjA");
        tracker.register("Program.cs", "ProjA");

        assert_eq!(tracker.mark_focused("Form1.cs"), 2);

        let flags: Vec<_> = tracker.resources().iter().map(|r| r.is_stub).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn test_focus_by_decorated_caption() {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("UserControl1.xaml", "CSharp_WPF");
        tracker.register("UserControl1.xaml [Design]", "CSharp_WPF");

        assert_eq!(tracker.mark_focused("UserControl1.xaml!2 [Design]"), 2);
        assert_eq!(tracker.views_of("UserControl1.xaml").count(), 2);
        assert!(tracker.views_of("UserControl1.xaml").all(|r| !r.is_stub));
    }

    #[test]
    fn test_focus_on_untracked_caption_is_noop() {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("A", "");
        assert_eq!(tracker.mark_focused("B"), 0);
        assert!(tracker.resources()[0].is_stub);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("A", "");
        tracker.register("B [Design]", "");
        tracker.mark_focused("A");
        tracker.mark_focused("B");

        tracker.reset_all_to_stub();
        let once = tracker.resources().to_vec();
        tracker.reset_all_to_stub();
        assert_eq!(tracker.resources(), once.as_slice());
        assert!(once.iter().all(|r| r.is_stub));
    }

    #[test]
    fn test_stub_expected_and_observed_passes() -> Result<()> {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("A", "");
        let mut host = ScriptedObserver::default().with("A", &[Stub]);

        let result = tracker.verify_against(&mut host, fast_wait())?;
        assert!(result.passed());
        assert_eq!(result.checked, 1);
        Ok(())
    }

    #[test]
    fn test_loaded_too_early_fails_without_waiting() -> Result<()> {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("A", "grp");
        let mut host = ScriptedObserver::default().with("A", &[Loaded]);

        let result = tracker.verify_against(&mut host, fast_wait())?;
        assert!(!result.passed());
        let failure = result.failure_for("A").expect("mismatch for A");
        assert_eq!(failure.expected, ExpectedLoadState::Stub);
        assert_eq!(failure.observed, Loaded);
        assert_eq!(failure.group, "grp");
        assert_eq!(host.polls("A"), 1);
        Ok(())
    }

    #[test]
    fn test_delayed_materialization_is_absorbed() -> Result<()> {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("A", "");
        tracker.mark_focused("A");
        let mut host = ScriptedObserver::default().with("A", &[Stub, Stub, Stub, Loaded]);

        let result = tracker.verify_against(&mut host, fast_wait())?;
        assert!(result.passed());
        assert_eq!(host.polls("A"), 4);
        Ok(())
    }

    #[test]
    fn test_stuck_stub_fails_after_timeout() -> Result<()> {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("A", "");
        tracker.mark_focused("A");
        let mut host = ScriptedObserver::default().with("A", &[Stub]);

        let result = tracker.verify_against(&mut host, WaitOptions::from_millis(20, 2))?;
        let failure = result.failure_for("A").expect("mismatch for A");
        assert_eq!(failure.expected, ExpectedLoadState::Loaded);
        assert_eq!(failure.observed, Stub);
        assert!(host.polls("A") > 1);
        Ok(())
    }

    #[test]
    fn test_not_found_without_qualifier_is_fatal() {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("B", "");
        tracker.mark_focused("B");
        let mut host = ScriptedObserver::default()
            .with("B", &[NotFound])
            .with("B!2", &[Loaded]);

        let err = tracker
            .verify_against(&mut host, fast_wait())
            .expect_err("missing caption must be fatal");
        let unresolved = err
            .downcast_ref::<UnresolvedResource>()
            .expect("typed error");
        assert_eq!(unresolved.identity, "B");
        assert_eq!(unresolved.reason, UnresolvedReason::NoQualifier);
    }

    #[test]
    fn test_renamed_window_is_rekeyed() -> Result<()> {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("Form1.cs!1 [Design]", "ProjA");
        tracker.register("Other.cs", "ProjA");
        tracker.mark_focused("Form1.cs");
        let mut host = ScriptedObserver::default()
            .with("Other.cs", &[Stub])
            .with("Form1.cs!2 [Design]", &[Loaded]);

        let result = tracker.verify_against(&mut host, fast_wait())?;
        assert!(result.passed());
        assert_eq!(
            result.rekeyed,
            vec![Rekey {
                from: "Form1.cs!1 [Design]".to_string(),
                to: "Form1.cs!2 [Design]".to_string(),
            }]
        );
        assert_eq!(tracker.resources()[0].identity, "Form1.cs!2 [Design]");

        // The re-keyed entry still answers to its canonical name.
        tracker.reset_all_to_stub();
        assert_eq!(tracker.mark_focused("Form1.cs"), 1);
        Ok(())
    }

    #[test]
    fn test_rekey_prefers_unclaimed_window() -> Result<()> {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("Form1.cs", "ProjA");
        tracker.register("Form1.cs!1 [Design]", "ProjA");
        let mut host = ScriptedObserver::default()
            .with("Form1.cs", &[Stub])
            .with("Form1.cs!2 [Design]", &[Stub]);

        let result = tracker.verify_against(&mut host, fast_wait())?;
        assert!(result.passed());
        assert_eq!(tracker.resources()[0].identity, "Form1.cs");
        assert_eq!(tracker.resources()[1].identity, "Form1.cs!2 [Design]");
        Ok(())
    }

    #[test]
    fn test_numbered_copy_of_qualified_caption_is_followed() -> Result<()> {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("Form1.cs", "ProjA");
        tracker.register("Form1.cs [Design]", "ProjA");
        tracker.mark_focused("Form1.cs");
        let mut host = ScriptedObserver::default()
            .with("Form1.cs", &[Loaded])
            .with("Form1.cs [Design]!2", &[Loaded]);

        let result = tracker.verify_against(&mut host, fast_wait())?;
        assert!(result.passed());
        assert_eq!(tracker.resources()[1].identity, "Form1.cs [Design]!2");
        Ok(())
    }

    #[test]
    fn test_vanished_view_never_matches_sibling_view() {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("Form1.cs [Design]", "ProjA");
        tracker.mark_focused("Form1.cs [Design]");
        let mut host = ScriptedObserver::default()
            .with("Form1.cs", &[Loaded])
            .with("Form1.csproj", &[Loaded]);

        let err = tracker
            .verify_against(&mut host, fast_wait())
            .expect_err("the designer window is gone");
        let unresolved = err
            .downcast_ref::<UnresolvedResource>()
            .expect("typed error");
        assert_eq!(unresolved.identity, "Form1.cs [Design]");
        assert_eq!(unresolved.reason, UnresolvedReason::NoCandidate);
        assert_eq!(tracker.resources()[0].identity, "Form1.cs [Design]");
    }

    #[test]
    fn test_candidate_vanishing_before_observe_is_fatal() {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("Form1.cs!1 [Design]", "ProjA");
        let mut host = ScriptedObserver::default().listed("Form1.cs!2 [Design]", &[NotFound]);

        let err = tracker
            .verify_against(&mut host, fast_wait())
            .expect_err("listed window is not observable");
        let unresolved = err
            .downcast_ref::<UnresolvedResource>()
            .expect("typed error");
        assert_eq!(unresolved.identity, "Form1.cs!1 [Design]");
        assert_eq!(unresolved.reason, UnresolvedReason::CandidateVanished);
        assert_eq!(host.polls("Form1.cs!2 [Design]"), 1);
        // Not re-keyed onto a window that could not be observed.
        assert_eq!(tracker.resources()[0].identity, "Form1.cs!1 [Design]");
        assert_eq!(tracker.views_of("Form1.cs").count(), 1);
    }

    #[test]
    fn test_no_candidate_is_fatal() {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("Form1.cs [Design]", "ProjA");
        let mut host = ScriptedObserver::default().with("Program.cs", &[Stub]);

        let err = tracker
            .verify_against(&mut host, fast_wait())
            .expect_err("no candidate");
        let unresolved = err
            .downcast_ref::<UnresolvedResource>()
            .expect("typed error");
        assert_eq!(unresolved.reason, UnresolvedReason::NoCandidate);
    }

    #[test]
    fn test_snapshot_roundtrip_keeps_flags() {
        let mut tracker = LazyLoadStateTracker::new();
        tracker.register("A", "g");
        tracker.register("B [Design]", "g");
        tracker.mark_focused("B");

        let restored = LazyLoadStateTracker::from_resources(tracker.resources().to_vec());
        assert_eq!(restored.resources(), tracker.resources());
        assert_eq!(restored.views_of("B").count(), 1);
        assert!(restored.get("B [Design]").is_some_and(|r| !r.is_stub));
    }
}
