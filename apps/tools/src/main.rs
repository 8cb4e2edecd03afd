use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use server_api::{
    l10n::Localization,
    paths::InstallPaths,
    provisioning::{NewOrganizationRequest, OrganizationProvisioner},
};
use shared::domain::UserId;
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/admin.db")]
    database_url: String,
    /// Installation root holding `languages/`, `themes/` and `data/`.
    #[arg(long, default_value = ".")]
    install_root: PathBuf,
    #[arg(long, default_value = "en")]
    language: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct UserArgs {
    #[arg(long)]
    login: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
}

#[derive(Args, Debug)]
struct OrganizationArgs {
    #[arg(long)]
    short_name: String,
    #[arg(long)]
    long_name: String,
    #[arg(long)]
    org_email: String,
    #[arg(long, default_value = "http://127.0.0.1:8080/")]
    homepage: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateUser(UserArgs),
    /// Creates the first user and makes them administrator of the first organization.
    Install {
        #[command(flatten)]
        user: UserArgs,
        #[command(flatten)]
        organization: OrganizationArgs,
    },
    AddOrganization {
        #[arg(long)]
        creator_user_id: i64,
        #[command(flatten)]
        organization: OrganizationArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;
    let l10n = Localization::load(&InstallPaths::new(&cli.install_root), &cli.language);

    match cli.command {
        Command::CreateUser(user) => {
            let user_id = create_user(&storage, &user).await?;
            println!("created user_id={user_id}");
        }
        Command::Install { user, organization } => {
            if storage.count_organizations().await? > 0 {
                bail!("database already holds an organization, use add-organization");
            }
            let user_id = create_user(&storage, &user).await?;
            let organization_id =
                add_organization(&storage, &l10n, &cli.language, user_id, &organization).await?;
            println!("created user_id={user_id} organization_id={organization_id}");
        }
        Command::AddOrganization {
            creator_user_id,
            organization,
        } => {
            let creator = UserId(creator_user_id);
            if storage.user(creator).await?.is_none() {
                bail!("user {creator} does not exist");
            }
            let organization_id =
                add_organization(&storage, &l10n, &cli.language, creator, &organization).await?;
            println!("created organization_id={organization_id}");
        }
    }

    Ok(())
}

async fn create_user(storage: &Storage, user: &UserArgs) -> Result<UserId> {
    storage
        .create_user(&user.login, &user.first_name, &user.last_name, &user.email)
        .await
}

async fn add_organization(
    storage: &Storage,
    l10n: &Localization,
    language: &str,
    creator: UserId,
    organization: &OrganizationArgs,
) -> Result<shared::domain::OrganizationId> {
    let request = NewOrganizationRequest {
        orga_short_name: organization.short_name.clone(),
        orga_long_name: organization.long_name.clone(),
        orga_email: organization.org_email.clone(),
    };
    let organization_id = OrganizationProvisioner::new(storage, &organization.homepage, l10n)
        .create(&request, creator, language)
        .await?;
    Ok(organization_id)
}
