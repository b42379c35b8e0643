use thiserror::Error;
use tracing::{debug, info};

use crate::kscreen::DisplayTool;
use crate::layout::{self, Layout, Side};
use crate::monitor::{self, Monitor};
use crate::store::{LayoutStore, SavedLayout};

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("no saved layout found in {0}, run with --save first")]
    NoSavedLayout(String),

    #[error("no connected monitors reported by kscreen-doctor")]
    NoMonitors,
}

pub struct LayoutManager<T: DisplayTool> {
    tool: T,
    store: LayoutStore,
}

impl<T: DisplayTool> LayoutManager<T> {
    pub fn new(tool: T, store: LayoutStore) -> Self {
        Self { tool, store }
    }

    fn monitors(&mut self) -> anyhow::Result<Vec<Monitor>> {
        let raw = self.tool.query_outputs()?;
        let monitors = monitor::parse_outputs(&raw)?;

        for m in &monitors {
            debug!(
                "Output {} {}: {} {} priority {} ({}, {})",
                m.id,
                m.name,
                m.position,
                m.resolution,
                m.priority,
                if m.enabled { "enabled" } else { "disabled" },
                if m.connected { "connected" } else { "disconnected" },
            );
        }

        Ok(monitors)
    }

    fn connected_monitors(&mut self) -> anyhow::Result<Vec<Monitor>> {
        let monitors: Vec<_> = self
            .monitors()?
            .into_iter()
            .filter(|m| m.connected)
            .collect();

        if monitors.is_empty() {
            return Err(ManagerError::NoMonitors.into());
        }

        Ok(monitors)
    }

    fn apply(&mut self, layout: &Layout) -> anyhow::Result<()> {
        let args = layout.to_args();
        info!("Applying layout: {}", args.join(" "));

        self.tool.apply(&args)
    }

    /// Names of all outputs, in the order kscreen-doctor reports them.
    pub fn list(&mut self) -> anyhow::Result<Vec<String>> {
        Ok(self.monitors()?.into_iter().map(|m| m.name).collect())
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        let monitors = self.connected_monitors()?;
        self.store.save(&monitors)?;

        info!(
            "Saved layout of {} monitors to {}",
            monitors.len(),
            self.store.path().display()
        );

        Ok(())
    }

    // Every apply mode refuses to run before the first save
    fn saved_layout(&self) -> anyhow::Result<SavedLayout> {
        let saved = self.store.load()?.ok_or_else(|| {
            ManagerError::NoSavedLayout(self.store.path().display().to_string())
        })?;

        Ok(saved)
    }

    /// Restores the saved layout, disabling the monitors named in `disabled`.
    pub fn apply_saved(&mut self, disabled: &[String]) -> anyhow::Result<()> {
        let saved = self.saved_layout()?;
        let monitors = self.connected_monitors()?;
        let layout = layout::plan_saved(&monitors, &saved, disabled);

        self.apply(&layout)
    }

    pub fn apply_single(&mut self, side: Side) -> anyhow::Result<()> {
        self.saved_layout()?;

        let monitors = self.connected_monitors()?;
        let layout = layout::plan_single(&monitors, side);

        self.apply(&layout)
    }

    pub fn apply_left_right(&mut self) -> anyhow::Result<()> {
        self.saved_layout()?;

        let monitors = self.connected_monitors()?;
        let layout = layout::plan_left_right(&monitors);

        self.apply(&layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{monitor, temp_store};

    use std::fs;

    const THREE_OUTPUTS: &str = "\
Output: 1 A enabled connected priority 1 Geometry: 0,0 (1920x1080)
Output: 2 B enabled connected priority 2 Geometry: 1920,0 (2560x1440)
Output: 3 C enabled connected priority 3 Geometry: 4480,0 (1920x1080)
";

    #[derive(Default)]
    struct MockTool {
        outputs: String,
        applied: Vec<Vec<String>>,
    }

    impl MockTool {
        fn with_outputs(outputs: &str) -> Self {
            Self {
                outputs: outputs.to_string(),
                ..Default::default()
            }
        }
    }

    impl DisplayTool for MockTool {
        fn query_outputs(&mut self) -> anyhow::Result<String> {
            Ok(self.outputs.clone())
        }

        fn apply(&mut self, args: &[String]) -> anyhow::Result<()> {
            self.applied.push(args.to_vec());
            Ok(())
        }
    }

    fn manager(test_name: &str) -> LayoutManager<MockTool> {
        LayoutManager::new(MockTool::with_outputs(THREE_OUTPUTS), temp_store(test_name))
    }

    #[test]
    fn list_keeps_query_order() {
        let mut manager = manager("core-list");

        assert_eq!(manager.list().unwrap(), ["A", "B", "C"]);
        assert!(manager.tool.applied.is_empty());
    }

    #[test]
    fn save_writes_one_line_per_monitor() {
        let mut manager = manager("core-save");
        manager.save().unwrap();
        manager.save().unwrap();

        let content = fs::read_to_string(manager.store.path()).unwrap();
        assert_eq!(content, "A 0,0 1\nB 1920,0 2\nC 4480,0 3\n");
        assert!(manager.tool.applied.is_empty());
    }

    fn assert_no_saved_layout(err: anyhow::Error) {
        assert!(matches!(
            err.downcast_ref::<ManagerError>(),
            Some(ManagerError::NoSavedLayout(_))
        ));
        assert!(err.to_string().contains("--save"));
    }

    #[test]
    fn apply_saved_without_save_fails() {
        let mut manager = manager("core-nosave");

        assert_no_saved_layout(manager.apply_saved(&[]).unwrap_err());
        assert!(manager.tool.applied.is_empty());
    }

    #[test]
    fn left_and_right_without_save_fail() {
        let mut manager = manager("core-nosave-sides");

        assert_no_saved_layout(manager.apply_single(Side::Left).unwrap_err());
        assert_no_saved_layout(manager.apply_single(Side::Right).unwrap_err());
        assert_no_saved_layout(manager.apply_left_right().unwrap_err());
        assert!(manager.tool.applied.is_empty());
    }

    #[test]
    fn restore_after_save_ignores_stale_duplicates() {
        let mut manager = manager("core-duplicates");
        fs::create_dir_all(manager.store.path().parent().unwrap()).unwrap();
        fs::write(manager.store.path(), "A 100,0 1\nA 200,0 1\n").unwrap();

        manager.save().unwrap();
        manager.apply_saved(&[]).unwrap();

        assert!(manager.tool.applied[0]
            .contains(&"output.A.position.0,0".to_string()));
    }

    #[test]
    fn apply_saved_restores_and_disables() {
        let mut manager = manager("core-restore");
        manager.save().unwrap();

        manager.tool.outputs = THREE_OUTPUTS.replace("4480,0", "0,1080");
        manager.apply_saved(&["A".to_string()]).unwrap();

        assert_eq!(
            manager.tool.applied,
            [vec![
                "output.A.disable",
                "output.B.enable",
                "output.B.position.1920,0",
                "output.B.priority.2",
                "output.C.enable",
                "output.C.position.4480,0",
                "output.C.priority.3",
            ]]
        );
    }

    #[test]
    fn left_right_invokes_tool_once() {
        let mut manager = manager("core-lr");
        manager.save().unwrap();
        manager.apply_left_right().unwrap();

        assert_eq!(manager.tool.applied.len(), 1);
        assert!(manager.tool.applied[0]
            .contains(&"output.C.position.1920,0".to_string()));
    }

    #[test]
    fn left_only_uses_origin() {
        let mut manager = manager("core-left");
        manager.save().unwrap();
        manager.apply_single(Side::Left).unwrap();

        assert_eq!(
            manager.tool.applied[0],
            [
                "output.A.enable",
                "output.A.position.0,0",
                "output.A.priority.1",
                "output.B.disable",
                "output.C.disable",
            ]
        );
    }

    #[test]
    fn no_connected_monitors_is_an_error() {
        let store = temp_store("core-empty");
        store.save(&[monitor("A", 0, 1920, 1)]).unwrap();
        let mut manager = LayoutManager::new(MockTool::default(), store);

        let err = manager.apply_single(Side::Right).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ManagerError>(),
            Some(ManagerError::NoMonitors)
        ));
        assert!(manager.tool.applied.is_empty());
    }
}
