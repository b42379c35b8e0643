use anyhow::Context;
use tracing::{debug, warn};

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::monitor::{Monitor, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SavedPlacement {
    pub position: Position,
    pub priority: u32,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SavedLayout {
    placements: HashMap<String, SavedPlacement>,
}

impl SavedLayout {
    pub fn get(&self, monitor_name: &str) -> Option<&SavedPlacement> {
        self.placements.get(monitor_name)
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }
}

// One line of the store: `<name> <x,y> <priority>`
fn parse_line(line: &str) -> Option<(&str, SavedPlacement)> {
    let mut fields = line.split_whitespace();

    let name = fields.next()?;
    let position = fields.next()?.parse().ok()?;
    let priority = fields.next()?.parse().ok()?;

    if fields.next().is_some() {
        return None;
    }

    Some((
        name,
        SavedPlacement {
            position,
            priority,
        },
    ))
}

fn line_name(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

fn format_line(monitor: &Monitor) -> String {
    format!("{} {} {}", monitor.name, monitor.position, monitor.priority)
}

/// Flat-file store of saved monitor placements, one line per monitor.
#[derive(Debug, Clone)]
pub struct LayoutStore {
    path: PathBuf,
}

impl LayoutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_lines(&self) -> anyhow::Result<Option<Vec<String>>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content.lines().map(String::from).collect())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| {
                format!("Couldn't read layout file {}", self.path.display())
            }),
        }
    }

    /// Returns `None` if nothing was ever saved to this store.
    pub fn load(&self) -> anyhow::Result<Option<SavedLayout>> {
        let Some(lines) = self.read_lines()? else {
            debug!("No layout file at {}", self.path.display());
            return Ok(None);
        };

        let mut layout = SavedLayout::default();

        for (number, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            match parse_line(line) {
                // The first line of a monitor is the one `save` keeps updated
                Some((name, placement)) => {
                    layout
                        .placements
                        .entry(name.to_string())
                        .or_insert(placement);
                }
                None => warn!(
                    "Skipping malformed line {} in {}: {line:?}",
                    number + 1,
                    self.path.display()
                ),
            }
        }

        debug!(
            "Loaded {} saved placements from {}",
            layout.len(),
            self.path.display()
        );

        Ok(if layout.is_empty() { None } else { Some(layout) })
    }

    /// Updates the line of every given monitor in place, or appends it if the
    /// monitor was never saved. Later duplicate lines of a saved monitor are
    /// dropped; lines for other monitors are left untouched.
    pub fn save(&self, monitors: &[Monitor]) -> anyhow::Result<()> {
        let mut lines = self.read_lines()?.unwrap_or_default();
        lines.retain(|line| !line.trim().is_empty());

        for monitor in monitors {
            let name = Some(monitor.name.as_str());
            let existing =
                lines.iter().position(|line| line_name(line) == name);

            match existing {
                Some(index) => {
                    lines[index] = format_line(monitor);

                    let mut number = 0;
                    lines.retain(|line| {
                        number += 1;
                        number <= index + 1 || line_name(line) != name
                    });
                }
                None => lines.push(format_line(monitor)),
            }
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Couldn't create directory {}", parent.display())
                })?;
            }
        }

        let mut content = lines.join("\n");
        content.push('\n');

        fs::write(&self.path, content).with_context(|| {
            format!("Couldn't write layout file {}", self.path.display())
        })?;

        debug!(
            "Saved {} monitors to {}",
            monitors.len(),
            self.path.display()
        );

        Ok(())
    }
}
