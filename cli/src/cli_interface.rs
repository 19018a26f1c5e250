use clap::{Args, Parser};

#[allow(clippy::upper_case_acronyms)]
#[derive(Parser, Debug)]
#[clap(name = "rosterstore", about, version)]
pub struct CLI {
    /// optional - Log level (error, warn, info, debug, trace), default is info.
    #[clap(long, global = true)]
    pub log_level: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// optional - The path to the rosterstore.yaml, default will be the one where the command is run.
    #[clap(long, short)]
    pub config: Option<String>,

    /// optional - The organization the rows belong to, default will be `organization_id` from the config.
    #[clap(long, short)]
    pub organization: Option<String>,
}

#[derive(Parser, Debug)]
#[clap(about = "Persist user-management aggregates into Postgres over pipelined batches", long_about = None)]
pub enum Commands {
    /// Creates a rosterstore.yaml with default settings.
    ///
    /// Example:
    /// `rosterstore init --name roster`
    #[clap(name = "init")]
    Init {
        /// The name of the project.
        #[clap(long, short)]
        name: String,

        /// optional - The path to create the config in, default will be where the command is run.
        #[clap(long, short)]
        path: Option<String>,
    },

    /// Upserts every student of an input file, with their addresses, phone numbers,
    /// enrollment history and tags.
    ///
    /// Example:
    /// `rosterstore upsert-students --file students.yaml --organization org-1`
    #[clap(name = "upsert-students")]
    UpsertStudents {
        /// The YAML input file holding a `students` list.
        #[clap(long, short)]
        file: String,

        #[clap(flatten)]
        project: ProjectArgs,
    },

    /// Upserts every parent of an input file, with their phone numbers and student links.
    ///
    /// Example:
    /// `rosterstore upsert-parents --file parents.yaml`
    #[clap(name = "upsert-parents")]
    UpsertParents {
        /// The YAML input file holding a `parents` list.
        #[clap(long, short)]
        file: String,

        #[clap(flatten)]
        project: ProjectArgs,
    },

    /// Soft-deletes students and their user accounts.
    ///
    /// Example:
    /// `rosterstore soft-delete-students --ids s1,s2`
    #[clap(name = "soft-delete-students")]
    SoftDeleteStudents {
        /// Comma separated student ids.
        #[clap(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,

        #[clap(flatten)]
        project: ProjectArgs,
    },

    /// Prints every statement an input file would send, batch by batch, without connecting
    /// to a database.
    ///
    /// Example:
    /// `rosterstore print-sql --file students.yaml --organization org-1`
    #[clap(name = "print-sql")]
    PrintSql {
        /// The YAML input file holding `students` and or `parents`.
        #[clap(long, short)]
        file: String,

        #[clap(flatten)]
        project: ProjectArgs,
    },
}
