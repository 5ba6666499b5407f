use exam_practice_engine::corpus::{Question, QuestionId, QuestionType};

pub const BASIC_IDS: std::ops::RangeInclusive<QuestionId> = 1..=40;
pub const ROAD_IDS: std::ops::RangeInclusive<QuestionId> = 1001..=1020;
pub const TUNNEL_IDS: std::ops::RangeInclusive<QuestionId> = 2001..=2010;

pub fn basic(id: QuestionId) -> Question {
    Question {
        id,
        question_type: QuestionType::Basic,
        category: "共通".to_string(),
        department: None,
        year: None,
        content: Default::default(),
    }
}

pub fn specialist(id: QuestionId, department: &str, category: &str, year: &str) -> Question {
    Question {
        id,
        question_type: QuestionType::Specialist,
        category: category.to_string(),
        department: Some(department.to_string()),
        year: Some(year.to_string()),
        content: Default::default(),
    }
}

/// 40 basic questions, 20 road questions split over 2019/2020 and 10 tunnel
/// questions from 2021.
pub fn sample_questions() -> Vec<Question> {
    let mut out: Vec<Question> = BASIC_IDS.map(basic).collect();
    out.extend(ROAD_IDS.map(|id| {
        let year = if id % 2 == 0 { "2019" } else { "2020" };
        specialist(id, "road", "道路", year)
    }));
    out.extend(TUNNEL_IDS.map(|id| specialist(id, "tunnel", "トンネル", "2021")));
    out
}
