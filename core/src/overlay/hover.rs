//! Hover visibility and copy feedback state machines.
//!
//! The button shows while the pointer is over the container, the button or
//! the tooltip. The tooltip shows while the pointer is over the button or the
//! tooltip, and hides after a grace delay so the pointer can travel between
//! the two:
//!
//! ```text
//!             enter btn/tip                  leave both
//!   Hidden ─────────────────▶ Showing ──────────────────▶ GracePending(g)
//!     ▲                          ▲                            │    │
//!     │                          └──── enter btn/tip ─────────┘    │
//!     └──────────────────── grace_elapsed(g) ──────────────────────┘
//! ```
//!
//! Each transition into `GracePending` takes a fresh generation, so a stale
//! timer from an earlier departure can never hide a tooltip that was
//! re-entered in the meantime.

/// Element the pointer entered or left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverTarget {
    Button,
    Tooltip,
    Container,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TooltipPhase {
    #[default]
    Hidden,
    Showing,
    GracePending {
        generation: u64,
    },
}

/// What the overlay must do with the tooltip after a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooltipAction {
    None,
    /// Make visible and reposition.
    Show,
    /// Start the grace timer for this generation.
    ScheduleHide { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverUpdate {
    pub button_visible: bool,
    pub tooltip: TooltipAction,
}

#[derive(Debug, Clone, Default)]
pub struct HoverMachine {
    over_button: bool,
    over_tooltip: bool,
    over_container: bool,
    phase: TooltipPhase,
    generation: u64,
}

impl HoverMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TooltipPhase {
        self.phase
    }

    pub fn button_visible(&self) -> bool {
        self.over_button || self.over_tooltip || self.over_container
    }

    fn tooltip_wanted(&self) -> bool {
        self.over_button || self.over_tooltip
    }

    /// Record the pointer entering (`inside = true`) or leaving `target`.
    pub fn pointer(&mut self, target: HoverTarget, inside: bool) -> HoverUpdate {
        match target {
            HoverTarget::Button => self.over_button = inside,
            HoverTarget::Tooltip => self.over_tooltip = inside,
            HoverTarget::Container => self.over_container = inside,
        }

        let tooltip = if self.tooltip_wanted() {
            self.phase = TooltipPhase::Showing;
            TooltipAction::Show
        } else {
            match self.phase {
                TooltipPhase::Showing => {
                    self.generation += 1;
                    self.phase = TooltipPhase::GracePending {
                        generation: self.generation,
                    };
                    TooltipAction::ScheduleHide {
                        generation: self.generation,
                    }
                }
                TooltipPhase::Hidden | TooltipPhase::GracePending { .. } => TooltipAction::None,
            }
        };

        HoverUpdate {
            button_visible: self.button_visible(),
            tooltip,
        }
    }

    /// The grace timer for `generation` fired. Returns true if the tooltip
    /// should hide now.
    pub fn grace_elapsed(&mut self, generation: u64) -> bool {
        match self.phase {
            TooltipPhase::GracePending { generation: pending } if pending == generation => {
                self.phase = TooltipPhase::Hidden;
                true
            }
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Copy Feedback
// ─────────────────────────────────────────────────────────────────────────────

/// Glyph shown on the button (Material Symbols ligature names).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Icon {
    #[default]
    Copy,
    Done,
    Failed,
}

impl Icon {
    pub fn glyph(self) -> &'static str {
        match self {
            Icon::Copy => "content_copy",
            Icon::Done => "done",
            Icon::Failed => "error",
        }
    }
}

/// Temporary icon swap after a copy attempt.
///
/// Only the most recent attempt's timer reverts the icon.
#[derive(Debug, Clone, Default)]
pub struct CopyFeedback {
    generation: u64,
}

impl CopyFeedback {
    /// Icon to show for a finished copy and the generation its revert timer
    /// must carry.
    pub fn copied(&mut self, succeeded: bool) -> (Icon, u64) {
        self.generation += 1;
        let icon = if succeeded { Icon::Done } else { Icon::Failed };
        (icon, self.generation)
    }

    /// The revert timer for `generation` fired.
    pub fn revert(&self, generation: u64) -> Option<Icon> {
        (generation == self.generation).then_some(Icon::Copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_hover_shows_button_only() {
        let mut hover = HoverMachine::new();
        let update = hover.pointer(HoverTarget::Container, true);
        assert!(update.button_visible);
        assert_eq!(update.tooltip, TooltipAction::None);
        assert_eq!(hover.phase(), TooltipPhase::Hidden);

        let update = hover.pointer(HoverTarget::Container, false);
        assert!(!update.button_visible);
    }

    #[test]
    fn test_button_hover_shows_tooltip_immediately() {
        let mut hover = HoverMachine::new();
        hover.pointer(HoverTarget::Container, true);
        let update = hover.pointer(HoverTarget::Button, true);
        assert!(update.button_visible);
        assert_eq!(update.tooltip, TooltipAction::Show);
        assert_eq!(hover.phase(), TooltipPhase::Showing);
    }

    #[test]
    fn test_leaving_schedules_hide_then_hides() {
        let mut hover = HoverMachine::new();
        hover.pointer(HoverTarget::Button, true);
        let update = hover.pointer(HoverTarget::Button, false);
        let TooltipAction::ScheduleHide { generation } = update.tooltip else {
            panic!("expected hide to be scheduled, got {:?}", update.tooltip);
        };
        assert!(hover.grace_elapsed(generation));
        assert_eq!(hover.phase(), TooltipPhase::Hidden);
    }

    #[test]
    fn test_reentry_within_grace_keeps_tooltip() {
        let mut hover = HoverMachine::new();
        hover.pointer(HoverTarget::Button, true);
        let TooltipAction::ScheduleHide { generation } =
            hover.pointer(HoverTarget::Button, false).tooltip
        else {
            panic!("expected hide to be scheduled");
        };
        // pointer travels onto the tooltip before the timer fires
        assert_eq!(hover.pointer(HoverTarget::Tooltip, true).tooltip, TooltipAction::Show);
        assert!(!hover.grace_elapsed(generation));
        assert_eq!(hover.phase(), TooltipPhase::Showing);
    }

    #[test]
    fn test_stale_generation_ignored_after_second_departure() {
        let mut hover = HoverMachine::new();
        hover.pointer(HoverTarget::Button, true);
        hover.pointer(HoverTarget::Button, false);
        hover.pointer(HoverTarget::Tooltip, true);
        let TooltipAction::ScheduleHide { generation } =
            hover.pointer(HoverTarget::Tooltip, false).tooltip
        else {
            panic!("expected hide to be scheduled");
        };
        assert!(!hover.grace_elapsed(generation - 1));
        assert!(hover.grace_elapsed(generation));
    }

    #[test]
    fn test_container_events_do_not_restart_grace() {
        let mut hover = HoverMachine::new();
        hover.pointer(HoverTarget::Button, true);
        hover.pointer(HoverTarget::Button, false);
        let update = hover.pointer(HoverTarget::Container, false);
        assert_eq!(update.tooltip, TooltipAction::None);
    }

    #[test]
    fn test_copy_feedback_latest_attempt_wins() {
        let mut feedback = CopyFeedback::default();
        let (icon, first) = feedback.copied(true);
        assert_eq!(icon, Icon::Done);
        let (icon, second) = feedback.copied(false);
        assert_eq!(icon, Icon::Failed);
        assert_eq!(feedback.revert(first), None);
        assert_eq!(feedback.revert(second), Some(Icon::Copy));
        assert_eq!(Icon::Copy.glyph(), "content_copy");
    }
}
