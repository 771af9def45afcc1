use std::collections::HashMap;

use shared::domain::RightPanelTool;

/// Options tab that carries the validation rules.
pub const VALIDATE_DATA_TAB: &str = "Validate Data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabContent {
    pub label: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolPanel {
    DocHistory,
    Tabs(Vec<TabContent>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContent {
    pub icon: &'static str,
    pub label: &'static str,
    pub panel: ToolPanel,
}

pub fn tool_content(
    tool: RightPanelTool,
    tabs: &HashMap<String, Vec<TabContent>>,
) -> Option<ToolContent> {
    match tool {
        RightPanelTool::DocHistory => Some(ToolContent {
            icon: "Log",
            label: "Document History",
            panel: ToolPanel::DocHistory,
        }),
        RightPanelTool::Validations => tabs.get(VALIDATE_DATA_TAB).map(|content| ToolContent {
            icon: "Validation",
            label: "Validation Rules",
            panel: ToolPanel::Tabs(content.clone()),
        }),
        RightPanelTool::None => None,
    }
}

#[cfg(test)]
#[path = "tests/panel_tests.rs"]
mod tests;
