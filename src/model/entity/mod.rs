mod user;
pub use user::{UserEntity, UserEntityCreateUpdate};

mod section;
pub use section::{Section, SectionCreateUpdate};

mod question;
pub use question::{OptionDraft, Question, QuestionCreateUpdate, QuestionWithOptionsRow};

pub(crate) mod option;
pub use option::{QuestionOption, QuestionOptionCreateUpdate};

mod user_answer;
pub use user_answer::{UserAnswer, UserAnswerCreateUpdate};

mod user_progress;
pub use user_progress::{UserProgress, UserProgressCreateUpdate};
