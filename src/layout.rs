use std::cmp::Ordering;
use std::fmt;

use tracing::warn;

use crate::monitor::{Monitor, Position};
use crate::store::SavedLayout;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Enable,
    Disable,
    Position(Position),
    Priority(u32),
}

/// A single `output.<name>.<action>` argument of kscreen-doctor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive {
    pub output: String,
    pub action: Action,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output.{}.", self.output)?;

        match &self.action {
            Action::Enable => write!(f, "enable"),
            Action::Disable => write!(f, "disable"),
            Action::Position(position) => write!(f, "position.{position}"),
            Action::Priority(priority) => write!(f, "priority.{priority}"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    directives: Vec<Directive>,
}

impl Layout {
    #[cfg(test)]
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    fn push(&mut self, output: &str, action: Action) {
        self.directives.push(Directive {
            output: output.to_string(),
            action,
        });
    }

    fn enable(&mut self, output: &str, position: Position, priority: u32) {
        self.push(output, Action::Enable);
        self.push(output, Action::Position(position));

        // kscreen-doctor numbers priorities from 1, zero means "not reported"
        if priority > 0 {
            self.push(output, Action::Priority(priority));
        }
    }

    fn disable(&mut self, output: &str) {
        self.push(output, Action::Disable);
    }

    /// Serializes the directives into kscreen-doctor arguments.
    pub fn to_args(&self) -> Vec<String> {
        self.directives.iter().map(ToString::to_string).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

// Equal x is broken by name so the choice doesn't depend on the order the
// tool enumerates outputs in
fn leftmost<'a>(monitors: &[&'a Monitor]) -> Option<&'a Monitor> {
    monitors.iter().copied().min_by(|a, b| {
        a.position
            .x
            .cmp(&b.position.x)
            .then_with(|| a.name.cmp(&b.name))
    })
}

fn rightmost<'a>(monitors: &[&'a Monitor]) -> Option<&'a Monitor> {
    monitors.iter().copied().min_by(|a, b| {
        match b.position.x.cmp(&a.position.x) {
            Ordering::Equal => a.name.cmp(&b.name),
            ordering => ordering,
        }
    })
}

fn connected(monitors: &[Monitor]) -> Vec<&Monitor> {
    monitors.iter().filter(|m| m.connected).collect()
}

/// Enables every connected monitor at its saved placement, falling back to
/// its live one, except those named in `disabled`.
pub fn plan_saved(
    monitors: &[Monitor],
    saved: &SavedLayout,
    disabled: &[String],
) -> Layout {
    let monitors = connected(monitors);
    let mut layout = Layout::default();

    for name in disabled {
        if !monitors.iter().any(|m| &m.name == name) {
            warn!("Monitor {name} is not connected, ignoring it");
        }
    }

    for monitor in monitors {
        if disabled.contains(&monitor.name) {
            layout.disable(&monitor.name);
            continue;
        }

        let (position, priority) = match saved.get(&monitor.name) {
            Some(placement) => (placement.position, placement.priority),
            None => {
                warn!(
                    "No saved placement for {}, keeping its current one",
                    monitor.name
                );
                (monitor.position, monitor.priority)
            }
        };

        layout.enable(&monitor.name, position, priority);
    }

    layout
}

/// Enables only the leftmost or rightmost connected monitor at the origin.
pub fn plan_single(monitors: &[Monitor], side: Side) -> Layout {
    let monitors = connected(monitors);
    let selected = match side {
        Side::Left => leftmost(&monitors),
        Side::Right => rightmost(&monitors),
    };

    let mut layout = Layout::default();

    for monitor in monitors {
        if Some(monitor.name.as_str()) == selected.map(|m| m.name.as_str()) {
            layout.enable(&monitor.name, Position::ORIGIN, 1);
        } else {
            layout.disable(&monitor.name);
        }
    }

    layout
}

/// Enables the leftmost and rightmost connected monitors side by side and
/// disables the rest.
pub fn plan_left_right(monitors: &[Monitor]) -> Layout {
    let connected_monitors = connected(monitors);

    let (Some(left), Some(right)) =
        (leftmost(&connected_monitors), rightmost(&connected_monitors))
    else {
        return Layout::default();
    };

    if left.name == right.name {
        return plan_single(monitors, Side::Left);
    }

    let left_width = i32::try_from(left.resolution.width).unwrap_or(i32::MAX);
    let right_position = Position::new(left_width, 0);
    let mut layout = Layout::default();

    for monitor in connected_monitors {
        if monitor.name == left.name {
            layout.enable(&monitor.name, Position::ORIGIN, 1);
        } else if monitor.name == right.name {
            layout.enable(&monitor.name, right_position, 2);
        } else {
            layout.disable(&monitor.name);
        }
    }

    layout
}
