use crate::models::domain::{EssayQuestion, Lesson, Module, Subject};
use chrono::Utc;


#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_fixtures_build_consistent_hierarchy() {
        let subject = test_subject("subject-1");
        let module = test_module("module-1", &subject.id, 1);
        let lesson = test_lesson("lesson-1", &module.id, &subject.id, Some(300.0));

        assert_eq!(module.subject_id, subject.id);
        assert_eq!(lesson.module_id, module.id);
        assert_eq!(lesson.subject_id, subject.id);
    }

    #[test]
    fn test_fixtures_question_is_dated() {
        let question = test_question("q-1", "Contract");
        assert!(question.year.is_some());
    }
}
