use clap::{Parser, Subcommand};
use statt::auth::hash_password;
use statt::model::entity::{
    OptionDraft, Question, QuestionCreateUpdate, Section, SectionCreateUpdate, UserEntity,
    UserEntityCreateUpdate, UserProgress,
};
use statt::model::{CrudRepository, DbConnection, ModelManager};
use statt::web::{AuthenticatedUser, UserRole};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(about = "CLI tool for filling the statt DB", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage sections
    Section {
        #[command(subcommand)]
        action: SectionCommands,
    },

    /// Manage questions
    Question {
        #[command(subcommand)]
        action: QuestionCommands,
    },

    /// Manage learner progress
    Progress {
        #[command(subcommand)]
        action: ProgressCommands,
    },
}

/// User management
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// `admin` or `user`
        #[arg(long, default_value = "user")]
        role: String,
    },
}

/// Section management
#[derive(Subcommand, Debug)]
pub enum SectionCommands {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "")]
        video_url: String,
        #[arg(long, default_value_t = 0)]
        order: i32,
    },
}

/// Question management
#[derive(Subcommand, Debug)]
pub enum QuestionCommands {
    Add {
        #[arg(long)]
        section_id: Uuid,
        #[arg(long)]
        question: String,
        /// Option text, repeat for every option
        #[arg(long = "option", required = true)]
        options: Vec<String>,
        /// Zero-based index of the correct option
        #[arg(long)]
        correct: usize,
    },
}

/// Progress management
#[derive(Subcommand, Debug)]
pub enum ProgressCommands {
    Reset {
        #[arg(long)]
        user_id: Uuid,
        #[arg(long)]
        section_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> statt::error::AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let url = std::env::var("DATABASE_URL").map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "DATABASE_URL is not set")
    })?;
    let db_con = DbConnection::connect(&url)?;
    let mm = ModelManager::new(db_con);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add {
                name,
                email,
                password,
                role,
            } => {
                let hash = hash_password(&password)?;
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreateUpdate::new(name, email, hash, UserRole::from(role.as_str())),
                )
                .await?;
                println!("User created: {} ({}, {})", user.id(), user.email(), user.role());
            }
        },

        Commands::Section { action } => match action {
            SectionCommands::Add {
                title,
                description,
                video_url,
                order,
            } => {
                let section = Section::create(
                    &mm,
                    &actor,
                    SectionCreateUpdate {
                        title,
                        description,
                        video_url,
                        section_order: order,
                        is_active: true,
                    },
                )
                .await?;
                println!("Section created: {} ({})", section.id(), section.title());
            }
        },

        Commands::Question { action } => match action {
            QuestionCommands::Add {
                section_id,
                question,
                options,
                correct,
            } => {
                let options = options
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| OptionDraft {
                        id: None,
                        text,
                        is_correct: i == correct,
                    })
                    .collect();

                let question = Question::create(
                    &mm,
                    &actor,
                    QuestionCreateUpdate {
                        section_id,
                        question,
                        options: Some(options),
                    },
                )
                .await?;
                println!("Question created: {}", question.id());
            }
        },

        Commands::Progress { action } => match action {
            ProgressCommands::Reset {
                user_id,
                section_id,
            } => {
                match UserProgress::find_by_user_and_section(&mm, &actor, user_id, section_id)
                    .await?
                {
                    Some(progress) => {
                        progress.reset(&mm, &actor).await?;
                        println!("Progress reset for user {} in section {}", user_id, section_id);
                    }
                    None => println!("No progress for user {} in section {}", user_id, section_id),
                }
            }
        },
    }

    Ok(())
}
