//! Element ids and classes the host page provides.

pub const CONTAINER_ID: &str = "factory_transp_container";
pub const DEPARTMENT_SELECT_ID: &str = "dep_filter_select";
pub const GROUPING_KEY_ID: &str = "main_item";
pub const APPLY_BUTTON_ID: &str = "apply_button";
pub const RESET_BUTTON_ID: &str = "reset";
pub const ZOOM_IN_ID: &str = "zoom_in";
pub const ZOOM_OUT_ID: &str = "zoom_out";
pub const OVERLAY_ID: &str = "full_page_overlay";
pub const LEGEND_ID: &str = "ul_color_map";
pub const INFO_TEXT_ID: &str = "viz_info_text";
pub const START_DATE_ID: &str = "start_date";
pub const END_DATE_ID: &str = "end_date";
pub const PRESET_SELECT_ID: &str = "date_preset";
pub const EXPORT_SVG_ID: &str = "export_svg";
/// Faded while a request is outstanding.
pub const DIMMED_IDS: [&str; 3] = ["header", "viz_container", "footer_container"];

pub const OVERLAY_CONTENT_CLASS: &str = "overlay_div";
pub const TABLE_BODY_SELECTOR: &str = "table tbody";
pub const TABLE_HEAD_SELECTOR: &str = "table thead";

pub const LOADING_OPACITY: &str = "0.18";
pub const EXPORT_FILE_NAME: &str = "flowmap.svg";
