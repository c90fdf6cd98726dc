use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::entity::{ApplicationMethod, ApplicationType, CropStatus, EntityId, QuantityUnit};

#[derive(Parser, Debug)]
#[command(name = "farm-records")]
#[command(version, about = "Local-first records for farms, input applications and crops")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (default: nearest .farm-records, or ./.farm-records)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// YAML store configuration
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage farms
    Farm(FarmCommand),

    /// Manage fertilizer, pesticide and herbicide applications
    #[command(alias = "app")]
    Application(ApplicationCommand),

    /// Manage crop plantings
    Crop(CropCommand),

    /// Show applications and crops together, newest first
    Records {
        /// Free-text query; supports farm:ID, from:DATE, to:DATE and type:TAG
        #[arg(value_name = "QUERY")]
        query: Vec<String>,

        /// Only records for this farm
        #[arg(long)]
        farm: Option<EntityId>,

        /// Earliest date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Latest date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// fertilizer, pesticide, herbicide or crop
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the activity log, most recent first
    Activities {
        /// Number of entries to show
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Dashboard counts and recent activity
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every farm, application, crop and activity
    Reset {
        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct FarmCommand {
    #[command(subcommand)]
    pub action: FarmAction,
}

#[derive(Subcommand, Debug)]
pub enum FarmAction {
    /// Add a farm
    Add {
        #[command(flatten)]
        fields: FarmFields,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List farms
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update a farm
    Update {
        id: EntityId,

        #[command(flatten)]
        fields: FarmFields,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a farm with all of its applications and crops
    Delete {
        id: EntityId,

        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct FarmFields {
    /// Farm name
    #[arg(long)]
    pub name: Option<String>,

    /// User-facing farm code, unique across farms
    #[arg(long = "farm-id", value_name = "CODE")]
    pub farm_id: Option<String>,

    /// Location (empty string clears it on update)
    #[arg(long)]
    pub location: Option<String>,

    /// Size in acres
    #[arg(long)]
    pub size: Option<f64>,
}

#[derive(Args, Debug)]
pub struct ApplicationCommand {
    #[command(subcommand)]
    pub action: ApplicationAction,
}

#[derive(Subcommand, Debug)]
pub enum ApplicationAction {
    /// Record an application
    Add {
        #[command(flatten)]
        fields: ApplicationFields,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List applications
    List {
        /// Only applications on this farm
        #[arg(long)]
        farm: Option<EntityId>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update an application
    Update {
        id: EntityId,

        #[command(flatten)]
        fields: ApplicationFields,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an application
    Delete {
        id: EntityId,

        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct ApplicationFields {
    /// fertilizer, pesticide or herbicide
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: Option<ApplicationType>,

    /// Product name
    #[arg(long)]
    pub product: Option<String>,

    #[arg(long)]
    pub quantity: Option<f64>,

    /// kg, liters or bags
    #[arg(long)]
    pub unit: Option<QuantityUnit>,

    /// Application date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,

    /// Farm the application was made on
    #[arg(long)]
    pub farm: Option<EntityId>,

    /// spray, granular or liquid
    #[arg(long)]
    pub method: Option<ApplicationMethod>,

    /// Free-form notes (empty string clears them on update)
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct CropCommand {
    #[command(subcommand)]
    pub action: CropAction,
}

#[derive(Subcommand, Debug)]
pub enum CropAction {
    /// Record a planting
    Add {
        #[command(flatten)]
        fields: CropFields,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List crops
    List {
        /// Only crops on this farm
        #[arg(long)]
        farm: Option<EntityId>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update a crop
    Update {
        id: EntityId,

        #[command(flatten)]
        fields: CropFields,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a crop
    Delete {
        id: EntityId,

        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct CropFields {
    /// Crop name
    #[arg(long)]
    pub name: Option<String>,

    /// Variety (empty string clears it on update)
    #[arg(long)]
    pub variety: Option<String>,

    /// Plantation date (YYYY-MM-DD)
    #[arg(long)]
    pub planted: Option<String>,

    /// Expected or actual harvest date (YYYY-MM-DD)
    #[arg(long)]
    pub harvest: Option<String>,

    /// Farm the crop is planted on
    #[arg(long)]
    pub farm: Option<EntityId>,

    /// Area in acres
    #[arg(long)]
    pub area: Option<f64>,

    /// Free-form notes (empty string clears them on update)
    #[arg(long)]
    pub notes: Option<String>,

    /// active, harvested or failed
    #[arg(long)]
    pub status: Option<CropStatus>,
}
