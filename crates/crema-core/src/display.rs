//! Image display state machine
//!
//! One `ImageLoadState` exists per rendered image. It is a pure reducer:
//! the caller feeds it load outcomes and timer events, and executes the
//! returned effects (start a load, show the placeholder, report the error).
//! Retries apply to displaying an already uploaded image only.

use std::time::Duration;

use crate::error::AppError;

/// Re-attempts of the same URL before giving up on it
pub const MAX_RETRIES: u32 = 2;

/// Time a load may stay unresolved before it counts as failed
pub const STALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Terminal display failure, reported once through the error callback
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("No renderable image URL")]
    NoSource,

    #[error("Image failed to load from {url} after {attempts} attempts")]
    Exhausted { url: String, attempts: u32 },
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::Render(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPhase {
    Loading,
    Loaded,
    /// Re-attempting the current source; carries the retry number
    Retrying(u32),
    /// Primary exhausted, loading the fallback
    FailedWithFallback,
    /// Terminal; the placeholder is shown
    FailedNoFallback,
}

impl DisplayPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, DisplayPhase::Loaded | DisplayPhase::FailedNoFallback)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Loaded,
    Failed,
    StallTimeout,
    SourceChanged {
        primary: String,
        fallback: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEffect {
    Load(String),
    ShowPlaceholder,
    NotifyError(RenderError),
}

/// Retry state owned by a single rendered image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLoadState {
    primary: String,
    /// Fallback as requested, before deduplication against the primary
    requested_fallback: Option<String>,
    fallback: Option<String>,
    source: String,
    retries: u32,
    phase: DisplayPhase,
    using_fallback: bool,
    error_reported: bool,
}

impl ImageLoadState {
    /// Fresh state for `primary`, together with the effects to run first.
    ///
    /// A fallback equal to the primary is ignored.
    pub fn start(
        primary: impl Into<String>,
        fallback: Option<String>,
    ) -> (Self, Vec<DisplayEffect>) {
        let primary = primary.into().trim().to_string();
        let requested_fallback = normalize_url(fallback);
        let fallback = requested_fallback.clone().filter(|f| *f != primary);

        let mut state = Self {
            source: primary.clone(),
            primary,
            requested_fallback,
            fallback,
            retries: 0,
            phase: DisplayPhase::Loading,
            using_fallback: false,
            error_reported: false,
        };

        let effects = if state.source.is_empty() {
            match state.fallback.take() {
                Some(fallback) => {
                    state.source = fallback.clone();
                    state.using_fallback = true;
                    state.phase = DisplayPhase::FailedWithFallback;
                    vec![DisplayEffect::Load(fallback)]
                }
                None => state.fail_terminally(RenderError::NoSource),
            }
        } else {
            vec![DisplayEffect::Load(state.source.clone())]
        };

        (state, effects)
    }

    pub fn phase(&self) -> DisplayPhase {
        self.phase
    }

    /// URL currently being loaded or displayed
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback
    }

    pub fn error_reported(&self) -> bool {
        self.error_reported
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Apply one event and return the effects the caller must perform
    pub fn apply(&mut self, event: DisplayEvent) -> Vec<DisplayEffect> {
        match event {
            DisplayEvent::SourceChanged { primary, fallback } => {
                let unchanged = primary.trim() == self.primary
                    && normalize_url(fallback.clone()) == self.requested_fallback;
                if unchanged {
                    return Vec::new();
                }
                let (state, effects) = Self::start(primary, fallback);
                *self = state;
                effects
            }
            _ if self.phase.is_terminal() => Vec::new(),
            DisplayEvent::Loaded => {
                self.phase = DisplayPhase::Loaded;
                Vec::new()
            }
            DisplayEvent::Failed | DisplayEvent::StallTimeout => self.on_failure(),
        }
    }

    fn on_failure(&mut self) -> Vec<DisplayEffect> {
        if self.retries < MAX_RETRIES {
            self.retries += 1;
            self.phase = DisplayPhase::Retrying(self.retries);
            tracing::debug!(url = %self.source, retry = self.retries, "Retrying image load");
            return vec![DisplayEffect::Load(self.source.clone())];
        }

        if !self.using_fallback {
            if let Some(fallback) = self.fallback.clone() {
                tracing::debug!(
                    primary = %self.source,
                    fallback = %fallback,
                    "Primary image exhausted retries, switching to fallback"
                );
                self.source = fallback.clone();
                self.retries = 0;
                self.using_fallback = true;
                self.phase = DisplayPhase::FailedWithFallback;
                return vec![DisplayEffect::Load(fallback)];
            }
        }

        let err = RenderError::Exhausted {
            url: self.source.clone(),
            attempts: self.retries + 1,
        };
        self.fail_terminally(err)
    }

    fn fail_terminally(&mut self, err: RenderError) -> Vec<DisplayEffect> {
        self.phase = DisplayPhase::FailedNoFallback;
        let mut effects = vec![DisplayEffect::ShowPlaceholder];
        if !self.error_reported {
            self.error_reported = true;
            tracing::warn!(error = %err, "Image display failed, showing placeholder");
            effects.push(DisplayEffect::NotifyError(err));
        }
        effects
    }
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY: &str = "https://res.cloudinary.com/cafe/image/upload/w_600,c_limit/a.jpg";
    const FALLBACK: &str = "https://res.cloudinary.com/cafe/image/upload/w_150,c_limit/a.jpg";

    fn error_count(effects: &[DisplayEffect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, DisplayEffect::NotifyError(_)))
            .count()
    }

    #[test]
    fn test_recovers_within_retry_budget() {
        let (mut state, effects) = ImageLoadState::start(PRIMARY, None);
        assert_eq!(effects, vec![DisplayEffect::Load(PRIMARY.to_string())]);

        assert_eq!(
            state.apply(DisplayEvent::Failed),
            vec![DisplayEffect::Load(PRIMARY.to_string())]
        );
        assert_eq!(state.phase(), DisplayPhase::Retrying(1));
        state.apply(DisplayEvent::StallTimeout);
        assert_eq!(state.phase(), DisplayPhase::Retrying(2));
        assert!(state.apply(DisplayEvent::Loaded).is_empty());
        assert_eq!(state.phase(), DisplayPhase::Loaded);
        assert_eq!(state.source(), PRIMARY);
    }

    #[test]
    fn test_swaps_to_fallback_and_resets_retries() {
        let (mut state, _) = ImageLoadState::start(PRIMARY, Some(FALLBACK.to_string()));
        state.apply(DisplayEvent::Failed);
        state.apply(DisplayEvent::Failed);
        let effects = state.apply(DisplayEvent::Failed);
        assert_eq!(effects, vec![DisplayEffect::Load(FALLBACK.to_string())]);
        assert_eq!(state.phase(), DisplayPhase::FailedWithFallback);
        assert_eq!(state.retries(), 0);
        assert!(state.is_using_fallback());

        assert!(state.apply(DisplayEvent::Loaded).is_empty());
        assert_eq!(state.phase(), DisplayPhase::Loaded);
        assert_eq!(state.source(), FALLBACK);
        assert!(!state.error_reported());
    }

    #[test]
    fn test_both_failing_reports_error_once() {
        let (mut state, _) = ImageLoadState::start(PRIMARY, Some(FALLBACK.to_string()));
        let mut notified = 0;
        for _ in 0..10 {
            notified += error_count(&state.apply(DisplayEvent::Failed));
        }
        assert_eq!(state.phase(), DisplayPhase::FailedNoFallback);
        assert_eq!(notified, 1);
        assert!(state.error_reported());
    }

    #[test]
    fn test_fallback_equal_to_primary_is_not_a_fallback() {
        let (mut state, _) = ImageLoadState::start(PRIMARY, Some(PRIMARY.to_string()));
        state.apply(DisplayEvent::Failed);
        state.apply(DisplayEvent::Failed);
        let effects = state.apply(DisplayEvent::Failed);
        assert_eq!(state.phase(), DisplayPhase::FailedNoFallback);
        assert_eq!(effects[0], DisplayEffect::ShowPlaceholder);
        assert_eq!(
            effects[1],
            DisplayEffect::NotifyError(RenderError::Exhausted {
                url: PRIMARY.to_string(),
                attempts: 3,
            })
        );
    }

    #[test]
    fn test_empty_source_shows_placeholder() {
        let (state, effects) = ImageLoadState::start("", None);
        assert_eq!(state.phase(), DisplayPhase::FailedNoFallback);
        assert_eq!(
            effects,
            vec![
                DisplayEffect::ShowPlaceholder,
                DisplayEffect::NotifyError(RenderError::NoSource)
            ]
        );
    }

    #[test]
    fn test_source_change_resets_state() {
        let (mut state, _) = ImageLoadState::start(PRIMARY, None);
        for _ in 0..3 {
            state.apply(DisplayEvent::Failed);
        }
        assert_eq!(state.phase(), DisplayPhase::FailedNoFallback);

        let effects = state.apply(DisplayEvent::SourceChanged {
            primary: FALLBACK.to_string(),
            fallback: None,
        });
        assert_eq!(effects, vec![DisplayEffect::Load(FALLBACK.to_string())]);
        assert_eq!(state.phase(), DisplayPhase::Loading);
        assert_eq!(state.retries(), 0);
        assert!(!state.error_reported());
    }

    #[test]
    fn test_unchanged_source_and_late_events_are_ignored() {
        let (mut state, _) = ImageLoadState::start(PRIMARY, None);
        state.apply(DisplayEvent::Failed);
        let same = state.apply(DisplayEvent::SourceChanged {
            primary: PRIMARY.to_string(),
            fallback: None,
        });
        assert!(same.is_empty());
        assert_eq!(state.phase(), DisplayPhase::Retrying(1));

        state.apply(DisplayEvent::Loaded);
        assert!(state.apply(DisplayEvent::Failed).is_empty());
        assert_eq!(state.phase(), DisplayPhase::Loaded);
    }

    #[test]
    fn test_same_props_with_duplicate_fallback_do_not_restart() {
        let (mut state, _) = ImageLoadState::start(PRIMARY, Some(PRIMARY.to_string()));
        state.apply(DisplayEvent::Failed);
        assert_eq!(state.phase(), DisplayPhase::Retrying(1));

        let effects = state.apply(DisplayEvent::SourceChanged {
            primary: PRIMARY.to_string(),
            fallback: Some(format!(" {} ", PRIMARY)),
        });
        assert!(effects.is_empty());
        assert_eq!(state.phase(), DisplayPhase::Retrying(1));
    }

    #[test]
    fn test_same_props_with_empty_primary_do_not_restart() {
        let (mut state, _) = ImageLoadState::start("", Some(FALLBACK.to_string()));
        assert!(state.is_using_fallback());
        state.apply(DisplayEvent::Loaded);

        let effects = state.apply(DisplayEvent::SourceChanged {
            primary: String::new(),
            fallback: Some(FALLBACK.to_string()),
        });
        assert!(effects.is_empty());
        assert_eq!(state.phase(), DisplayPhase::Loaded);
        assert_eq!(state.source(), FALLBACK);
    }
}
