mod commands;
mod handlers;

pub use commands::{
    ApplicationAction, ApplicationCommand, ApplicationFields, Cli, Commands, CropAction,
    CropCommand, CropFields, FarmAction, FarmCommand, FarmFields,
};
pub use handlers::{
    handle_activities, handle_application, handle_crop, handle_farm, handle_records,
    handle_reset, handle_summary, StoreLocation, CONFIG_FILE_NAME, DATA_DIR_NAME,
};
