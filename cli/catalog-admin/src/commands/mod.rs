mod create;
mod delete;
mod edit;
mod form;
mod list;
mod show;
mod upload;

use std::fmt;

use anyhow::Result;
use bpaf::Bpaf;
use indoc::indoc;
use product_catalog::{CatalogConsole, Client, ConsoleSettings, HttpImageUploader};
use tracing::debug;

use crate::config::Config;
use crate::utils::init::{init_catalog_client, init_image_uploader};

static ADMIN_DESCRIPTION: &'_ str = indoc! {"
    Manage the products of a catalog from the command line.\n\n

    List and search products page by page, inspect single products,
    and create, edit or delete them."
};

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

#[derive(Bpaf, Clone, Copy, Debug)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(
    options,
    version,
    descr(ADMIN_DESCRIPTION),
    footer("Configuration is read from 'catalog-admin.toml' and $CATALOG_ADMIN_* variables.")
)]
pub struct AdminCli(#[bpaf(external(admin_args))] pub AdminArgs);

/// Main catalog-admin args parser
///
/// To parse the full CLI, use [`AdminCli`] instead using [`admin_cli()`].
#[derive(Debug, Bpaf)]
#[bpaf(ignore_rustdoc)] // we don't want this struct to be interpreted as a group
pub struct AdminArgs {
    /// Verbose mode
    ///
    /// Invoke multiple times for increasing detail.
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    #[bpaf(external(commands))]
    command: Commands,
}

impl AdminArgs {
    pub async fn handle(self, config: Config) -> Result<()> {
        let session = Session::new(&config)?;
        self.command.handle(session).await
    }
}

#[derive(Bpaf, Clone)]
enum Commands {
    /// List products page by page
    #[bpaf(command, long("ls"))]
    List(#[bpaf(external(list::list))] list::List),

    /// Show all fields of a product
    #[bpaf(command)]
    Show(#[bpaf(external(show::show))] show::Show),

    /// Create a product
    #[bpaf(command)]
    Create(#[bpaf(external(create::create))] create::Create),

    /// Change fields of a product
    #[bpaf(command)]
    Edit(#[bpaf(external(edit::edit))] edit::Edit),

    /// Delete a product
    #[bpaf(command, long("rm"))]
    Delete(#[bpaf(external(delete::delete))] delete::Delete),

    /// Upload an image and print its URL
    #[bpaf(command)]
    Upload(#[bpaf(external(upload::upload))] upload::Upload),
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command")
    }
}

impl Commands {
    async fn handle(self, session: Session) -> Result<()> {
        match self {
            Commands::List(args) => args.handle(session).await?,
            Commands::Show(args) => args.handle(session).await?,
            Commands::Create(args) => args.handle(session).await?,
            Commands::Edit(args) => args.handle(session).await?,
            Commands::Delete(args) => args.handle(session).await?,
            Commands::Upload(args) => args.handle(session).await?,
        }
        Ok(())
    }
}

/// Everything a command needs to talk to the product API.
#[derive(Debug)]
pub struct Session {
    pub client: Client,
    pub uploader: HttpImageUploader,
    pub settings: ConsoleSettings,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self> {
        let session = Session {
            client: init_catalog_client(config)?,
            uploader: init_image_uploader(config)?,
            settings: config.console_settings(),
        };
        debug!(settings = ?session.settings, "initialized session");
        Ok(session)
    }

    pub fn console(self) -> CatalogConsole<Client, HttpImageUploader> {
        CatalogConsole::new(self.client, self.uploader, self.settings)
    }
}
