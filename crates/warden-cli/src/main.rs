mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use warden_auth::{PermissionType, Scope, WardenConfig};

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Multi-tenant permission catalog and resolver")]
#[command(version)]
struct Cli {
    /// Path to the Warden config directory (default: ~/.warden)
    #[arg(long, global = true, env = "WARDEN_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Warden configuration and database
    Init,

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Manage teams
    #[command(subcommand)]
    Team(TeamCommand),

    /// Manage project and team membership
    #[command(subcommand)]
    Member(MemberCommand),

    /// Manage permission definitions
    #[command(subcommand)]
    Perm(PermCommand),

    /// Grant a permission directly to a member
    Grant {
        project: String,
        user: String,
        permission: String,
        /// Team membership to grant on (project-level membership if omitted)
        #[arg(long)]
        team: Option<String>,
    },

    /// Revoke a directly granted permission
    Revoke {
        project: String,
        user: String,
        permission: String,
        #[arg(long)]
        team: Option<String>,
    },

    /// Show the permissions a member holds
    Effective {
        project: String,
        user: String,
        #[arg(long)]
        team: Option<String>,
        /// team or global
        #[arg(long = "type", default_value = "team")]
        permission_type: PermissionType,
        /// Only direct grants, without containment
        #[arg(long)]
        direct: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Create a project
    Create { project: String },
}

#[derive(Subcommand)]
enum TeamCommand {
    /// Create a team in a project
    Create { project: String, team: String },
}

#[derive(Subcommand)]
enum MemberCommand {
    /// Add a user to a project, or to one of its teams with --team
    Add {
        project: String,
        user: String,
        #[arg(long)]
        team: Option<String>,
    },
    /// Remove a user from a team (drops their direct grants on that team)
    Remove {
        project: String,
        team: String,
        user: String,
    },
}

#[derive(Subcommand)]
enum PermCommand {
    /// List definitions (global, any-team, team:<id>; all project-level if omitted)
    List {
        project: String,
        #[arg(long)]
        scope: Option<Scope>,
    },
    /// Create a custom definition
    Create {
        project: String,
        id: String,
        #[arg(long)]
        scope: Scope,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated ids this permission contains
        #[arg(long, value_delimiter = ',')]
        contains: Vec<String>,
    },
    /// Update a custom definition; --contains replaces the full list
    Update {
        project: String,
        id: String,
        #[arg(long)]
        scope: Scope,
        #[arg(long)]
        new_id: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_delimiter = ',')]
        contains: Option<Vec<String>>,
    },
    /// Delete a custom definition
    Delete {
        project: String,
        id: String,
        #[arg(long)]
        scope: Scope,
    },
}

fn init_tracing(base_dir: &std::path::Path) {
    let fallback = WardenConfig::load(&WardenConfig::default_path(base_dir))
        .map(|c| c.warden.log_filter)
        .unwrap_or_else(|_| "warden_auth=info,warden_cli=info".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base_dir = match cli.config_dir {
        Some(ref dir) => dir.clone(),
        None => WardenConfig::default_base_dir()?,
    };
    init_tracing(&base_dir);

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Init => rt.block_on(commands::init::run(&base_dir)),
        Commands::Project(ProjectCommand::Create { ref project }) => {
            rt.block_on(commands::tenancy::create_project(&base_dir, project))
        }
        Commands::Team(TeamCommand::Create {
            ref project,
            ref team,
        }) => rt.block_on(commands::tenancy::create_team(&base_dir, project, team)),
        Commands::Member(MemberCommand::Add {
            ref project,
            ref user,
            ref team,
        }) => rt.block_on(commands::tenancy::add_member(
            &base_dir,
            project,
            team.as_deref(),
            user,
        )),
        Commands::Member(MemberCommand::Remove {
            ref project,
            ref team,
            ref user,
        }) => rt.block_on(commands::tenancy::remove_member(
            &base_dir, project, team, user,
        )),
        Commands::Perm(PermCommand::List {
            ref project,
            ref scope,
        }) => rt.block_on(commands::perm::list(&base_dir, project, scope.as_ref())),
        Commands::Perm(PermCommand::Create {
            ref project,
            ref id,
            ref scope,
            ref description,
            ref contains,
        }) => rt.block_on(commands::perm::create(
            &base_dir,
            project,
            scope,
            id,
            description.clone(),
            contains.clone(),
        )),
        Commands::Perm(PermCommand::Update {
            ref project,
            ref id,
            ref scope,
            ref new_id,
            ref description,
            ref contains,
        }) => rt.block_on(commands::perm::update(
            &base_dir,
            project,
            scope,
            id,
            warden_auth::PermissionPatch {
                id: new_id.clone(),
                description: description.clone(),
                contain_ids: contains.clone(),
            },
        )),
        Commands::Perm(PermCommand::Delete {
            ref project,
            ref id,
            ref scope,
        }) => rt.block_on(commands::perm::delete(&base_dir, project, scope, id)),
        Commands::Grant {
            ref project,
            ref user,
            ref permission,
            ref team,
        } => rt.block_on(commands::grant::grant(
            &base_dir,
            project,
            team.as_deref(),
            user,
            permission,
        )),
        Commands::Revoke {
            ref project,
            ref user,
            ref permission,
            ref team,
        } => rt.block_on(commands::grant::revoke(
            &base_dir,
            project,
            team.as_deref(),
            user,
            permission,
        )),
        Commands::Effective {
            ref project,
            ref user,
            ref team,
            permission_type,
            direct,
            json,
        } => rt.block_on(commands::effective::run(
            &base_dir,
            project,
            team.as_deref(),
            user,
            permission_type,
            direct,
            json,
        )),
    }
}
