//! Application-wide constants and default values
//!
//! Centralized location for all hard-coded values to improve maintainability

/// Application name, also used as the config directory name
pub const APP_NAME: &str = "usd-props";

/// Config file looked up inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Tooltip rendering constants
pub mod tooltip {
    /// Max amount of values listed in a mixed-value tooltip
    pub const SUMMARY_LIMIT: usize = 25;

    /// Rendered values longer than this are listed one per line
    pub const SEPARATE_LINES_THRESHOLD: usize = 10;

    /// Prefix of the tooltip shown for mixed values
    pub const MIXED_PREFIX: &str = "Mixed Values: ";

    /// Appended when the value list was truncated
    pub const TRUNCATION_SUFFIX: &str = "...";

    /// Text shown in a field when the bound values disagree
    pub const MIXED_PLACEHOLDER: &str = "<Mixed>";

    /// Tooltip prefix for attributes that don't exist yet
    pub const VIRTUAL_PREFIX: &str = "[VIRTUAL] ";
}

/// Change listener constants
pub mod listener {
    /// Hashed node names (`mesh_0123456789ABCDEF`, `light_0123456789ABCDEF_2`)
    pub const DEFAULT_NODE_IDENTIFIER_PATTERN: &str = r"^(.*)([A-Z0-9]{16})(_\d+)*$";
}

/// Value model constants
pub mod model {
    /// Value rejected for every attribute kind
    pub const NULL_SENTINEL: &str = ".";
}

/// File picker constants
pub mod picker {
    /// Default label of the dialog's confirm button
    pub const DEFAULT_APPLY_LABEL: &str = "Select";

    /// Extensions offered when picking USD files
    pub const USD_FILE_EXTENSIONS: [&str; 3] = ["usd", "usda", "usdc"];

    /// Shown when a file dialog is confirmed without a file name
    pub const MISSING_FILE_NAME_MESSAGE: &str = "Please add a file name to proceed.";

    /// Width of the path text field
    pub const FIELD_WIDTH: f32 = 260.0;
}

/// UI spacing and sizing constants
pub mod ui {
    /// Default window size of the demo application
    pub const DEFAULT_WINDOW_SIZE: [f32; 2] = [720.0, 480.0];

    /// Width of the attribute name column
    pub const NAME_COLUMN_WIDTH: f32 = 160.0;

    /// Width of a single channel drag value
    pub const CHANNEL_WIDTH: f32 = 64.0;
}
