//! Engine-wide constants and default values
//!
//! Centralized location for all hard-coded values to improve maintainability

/// Label truncation metrics
pub mod label {
    /// Horizontal margin on each side of a port label (pixels)
    pub const MARGIN: f32 = 20.0;

    /// Space reserved for the port dot (pixels)
    pub const PORT_GUTTER: f32 = 20.0;

    /// Average rendered width of one label character (pixels)
    pub const AVERAGE_CHAR_WIDTH: f32 = 10.0;

    /// Width used when the node has not been laid out yet
    pub const FALLBACK_NODE_WIDTH: f32 = 210.0;

    /// Prefix marking a left-truncated label
    pub const ELLIPSIS: &str = "...";
}

/// Deferred re-entry delays (milliseconds)
pub mod schedule {
    /// After node creation, before the first port pass
    pub const AFTER_CREATE_MS: u64 = 10;

    /// After a connection change, before widgets are reconciled
    pub const AFTER_CONNECTION_MS: u64 = 20;

    /// After restore, before the full port + widget pass
    pub const AFTER_RESTORE_MS: u64 = 50;
}

/// Proxy node naming
pub mod port {
    /// Name prefix shared by every proxy output and its local widget
    pub const NAME_PREFIX: &str = "connect_to_widget_input_";

    /// Data type of the proxy outputs (accepts anything)
    pub const ANY_TYPE: &str = "*";
}

/// Node layout metrics used by size computation
pub mod layout {
    /// Height of a single port row
    pub const SLOT_HEIGHT: f32 = 20.0;

    /// Height of a one-line widget row
    pub const WIDGET_HEIGHT: f32 = 20.0;

    /// Height of a multi-line text widget
    pub const MULTILINE_WIDGET_HEIGHT: f32 = 60.0;

    /// Vertical gap between widget rows
    pub const WIDGET_SPACING: f32 = 4.0;

    /// Bottom padding below the last row
    pub const BOTTOM_PADDING: f32 = 8.0;

    /// Narrowest a node is ever computed to be
    pub const MIN_NODE_WIDTH: f32 = 140.0;

    /// Width reserved per title character
    pub const TITLE_CHAR_WIDTH: f32 = 8.0;

    /// Height given to a freshly created proxy node
    pub const INITIAL_NODE_HEIGHT: f32 = 32.0;
}
