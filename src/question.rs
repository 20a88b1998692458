//! Abstract quiz questions and the question bank encoder
//!
//! A [`Question`] is lowered into two artifacts:
//!
//! 1. an inline cloze string such as `{1:MULTICHOICE:=Paris#Yes~Lyon#No}`
//! 2. a two-entry bank tree: a `multianswer` parent holding the prompt and a
//!    `{#1}` placeholder, and a concrete child holding the answers.
//!
//! Grammar of the cloze string:
//!
//! ```text
//! {1:MULTICHOICE:=right#feedback~wrong#feedback~=also right}
//! {1:NUMERICAL:=42:0.5#feedback}      tolerance clause omitted when zero
//! {1:SHORTANSWER:=colour~=color}
//! ```
//!
//! Options after the first are separated by `~`, so an incorrect option
//! always reads `~text` and a correct one `=text` (or `~=text` when it is not
//! first). Literal `\ } # ~ / "` inside option text and feedback are escaped
//! with a backslash.

use crate::error::{MbzError, Result};
use crate::ids::{IdAllocator, IdClass};
use serde::{Deserialize, Serialize};

/// Flat bank entry ids are `quiz_id * BANK_ENTRY_STRIDE + local_seq`.
///
/// A quiz whose local sequence exceeds the stride produces ids that overlap
/// the next quiz's range. The scheme is kept as is; the builder logs a warning
/// when it happens.
pub const BANK_ENTRY_STRIDE: u64 = 1000;

/// Concrete question types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Multichoice,
    Numerical,
    Shortanswer,
}

impl QuestionType {
    /// Plugin name used as `qtype` in bank documents
    pub fn qtype(self) -> &'static str {
        match self {
            QuestionType::Multichoice => "multichoice",
            QuestionType::Numerical => "numerical",
            QuestionType::Shortanswer => "shortanswer",
        }
    }

    /// Keyword used inside the cloze braces
    pub fn cloze_keyword(self) -> &'static str {
        match self {
            QuestionType::Multichoice => "MULTICHOICE",
            QuestionType::Numerical => "NUMERICAL",
            QuestionType::Shortanswer => "SHORTANSWER",
        }
    }
}

/// Type-specific part of an abstract question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionKind {
    Multichoice {
        options: Vec<String>,
        /// Zero-based indices into `options`
        correct: Vec<usize>,
        /// Empty, or one entry per option
        #[serde(default)]
        feedback: Vec<String>,
    },
    Numerical {
        answer: f64,
        #[serde(default)]
        tolerance: f64,
        #[serde(default)]
        feedback: String,
    },
    Shortanswer {
        answers: Vec<String>,
        #[serde(default)]
        feedback: String,
    },
}

/// Abstract question description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Bank name; defaults to "Question <n>" when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub prompt: String,

    #[serde(default)]
    pub general_feedback: String,

    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl Question {
    pub fn multichoice(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct: Vec<usize>,
    ) -> Self {
        Self::with_kind(
            prompt,
            QuestionKind::Multichoice {
                options,
                correct,
                feedback: Vec::new(),
            },
        )
    }

    pub fn numerical(prompt: impl Into<String>, answer: f64, tolerance: f64) -> Self {
        Self::with_kind(
            prompt,
            QuestionKind::Numerical {
                answer,
                tolerance,
                feedback: String::new(),
            },
        )
    }

    pub fn shortanswer(prompt: impl Into<String>, answers: Vec<String>) -> Self {
        Self::with_kind(
            prompt,
            QuestionKind::Shortanswer {
                answers,
                feedback: String::new(),
            },
        )
    }

    fn with_kind(prompt: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            name: None,
            prompt: prompt.into(),
            general_feedback: String::new(),
            kind,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_general_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.general_feedback = feedback.into();
        self
    }

    /// Per-option feedback for multichoice, answer feedback otherwise
    pub fn with_feedback(mut self, feedback: Vec<String>) -> Self {
        match &mut self.kind {
            QuestionKind::Multichoice { feedback: fb, .. } => *fb = feedback,
            QuestionKind::Numerical { feedback: fb, .. }
            | QuestionKind::Shortanswer { feedback: fb, .. } => {
                *fb = feedback.into_iter().next().unwrap_or_default()
            }
        }
        self
    }

    pub fn question_type(&self) -> QuestionType {
        match self.kind {
            QuestionKind::Multichoice { .. } => QuestionType::Multichoice,
            QuestionKind::Numerical { .. } => QuestionType::Numerical,
            QuestionKind::Shortanswer { .. } => QuestionType::Shortanswer,
        }
    }

    /// Check the question is well formed
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(MbzError::validation("question prompt is empty"));
        }

        match &self.kind {
            QuestionKind::Multichoice {
                options,
                correct,
                feedback,
            } => {
                if options.len() < 2 {
                    return Err(MbzError::validation(format!(
                        "multichoice question needs at least 2 options, got {}",
                        options.len()
                    )));
                }
                if let Some(i) = options.iter().position(|o| o.trim().is_empty()) {
                    return Err(MbzError::validation(format!("option {} is empty", i)));
                }
                if correct.is_empty() {
                    return Err(MbzError::validation(
                        "multichoice question has no correct option",
                    ));
                }
                if let Some(&i) = correct.iter().find(|&&i| i >= options.len()) {
                    return Err(MbzError::validation(format!(
                        "correct index {} out of range for {} options",
                        i,
                        options.len()
                    )));
                }
                if !feedback.is_empty() && feedback.len() != options.len() {
                    return Err(MbzError::validation(format!(
                        "{} feedback entries for {} options",
                        feedback.len(),
                        options.len()
                    )));
                }
            }
            QuestionKind::Numerical {
                answer, tolerance, ..
            } => {
                if !answer.is_finite() {
                    return Err(MbzError::validation("numerical answer is not finite"));
                }
                if !tolerance.is_finite() || *tolerance < 0.0 {
                    return Err(MbzError::validation(format!(
                        "numerical tolerance {} must be a non-negative number",
                        tolerance
                    )));
                }
            }
            QuestionKind::Shortanswer { answers, .. } => {
                if answers.is_empty() {
                    return Err(MbzError::validation(
                        "shortanswer question has no accepted answers",
                    ));
                }
                if answers.iter().any(|a| a.trim().is_empty()) {
                    return Err(MbzError::validation("shortanswer answer is empty"));
                }
            }
        }

        Ok(())
    }
}

/// Escape cloze metacharacters in free text
///
/// A leading `=` or `%` would otherwise read as a grade marker.
pub fn escape_cloze(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 1);
    if text.starts_with(['=', '%']) {
        out.push('\\');
    }
    for ch in text.chars() {
        if matches!(ch, '\\' | '}' | '#' | '~' | '/' | '"') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn push_feedback(out: &mut String, feedback: &str) {
    if !feedback.is_empty() {
        out.push('#');
        out.push_str(&escape_cloze(feedback));
    }
}

/// Encode `question` as a single-slot cloze string
pub fn encode_cloze(question: &Question) -> String {
    let mut spec = String::new();

    match &question.kind {
        QuestionKind::Multichoice {
            options,
            correct,
            feedback,
        } => {
            for (i, option) in options.iter().enumerate() {
                let is_correct = correct.contains(&i);
                if i > 0 || !is_correct {
                    spec.push('~');
                }
                if is_correct {
                    spec.push('=');
                }
                spec.push_str(&escape_cloze(option));
                push_feedback(&mut spec, feedback.get(i).map(String::as_str).unwrap_or(""));
            }
        }
        QuestionKind::Numerical {
            answer,
            tolerance,
            feedback,
        } => {
            spec.push('=');
            spec.push_str(&answer.to_string());
            if *tolerance != 0.0 {
                spec.push(':');
                spec.push_str(&tolerance.to_string());
            }
            push_feedback(&mut spec, feedback);
        }
        QuestionKind::Shortanswer { answers, feedback } => {
            let parts: Vec<String> = answers
                .iter()
                .map(|a| {
                    let mut part = format!("={}", escape_cloze(a));
                    push_feedback(&mut part, feedback);
                    part
                })
                .collect();
            spec.push_str(&parts.join("~"));
        }
    }

    format!("{{1:{}:{}}}", question.question_type().cloze_keyword(), spec)
}

/// Composite key of a bank entry: owning quiz plus per-quiz sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub quiz_id: u64,
    pub local_seq: u64,
}

impl EntryKey {
    /// Flat numeric id written to documents
    pub fn flat_id(&self) -> u64 {
        self.quiz_id * BANK_ENTRY_STRIDE + self.local_seq
    }
}

/// Per-quiz bank entry counter, independent of the global question counter
#[derive(Debug, Clone)]
pub struct LocalSequence {
    quiz_id: u64,
    next: u64,
}

impl LocalSequence {
    pub fn new(quiz_id: u64) -> Self {
        Self { quiz_id, next: 1 }
    }

    pub fn next_key(&mut self) -> EntryKey {
        let key = EntryKey {
            quiz_id: self.quiz_id,
            local_seq: self.next,
        };
        self.next += 1;
        if key.local_seq > BANK_ENTRY_STRIDE {
            tracing::warn!(
                quiz_id = self.quiz_id,
                local_seq = key.local_seq,
                "bank entry sequence exceeded the id stride; flat ids collide with the next quiz"
            );
        }
        key
    }
}

/// Concrete answer row of a child entry
#[derive(Debug, Clone, PartialEq)]
pub struct BankAnswer {
    pub id: u64,
    pub text: String,
    /// 1.0 for correct, 0.0 for incorrect
    pub fraction: f64,
    pub feedback: String,
    /// Only set for numerical answers
    pub tolerance: Option<f64>,
}

/// Link between a bank entry and a related entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef {
    pub key: EntryKey,
    pub question_id: u64,
}

/// Body of a bank entry
#[derive(Debug, Clone, PartialEq)]
pub enum EntryBody {
    /// Composite wrapper; points at its single sub-question
    MultiAnswer { subquestion: EntryRef },
    /// Concrete sub-question owned by a wrapper
    Concrete {
        qtype: QuestionType,
        parent: EntryRef,
        answers: Vec<BankAnswer>,
    },
}

/// One versioned question definition in the bank
#[derive(Debug, Clone, PartialEq)]
pub struct BankEntry {
    pub key: EntryKey,
    /// Global question id
    pub question_id: u64,
    pub name: String,
    pub question_text: String,
    pub general_feedback: String,
    pub body: EntryBody,
}

impl BankEntry {
    pub fn qtype(&self) -> &'static str {
        match &self.body {
            EntryBody::MultiAnswer { .. } => "multianswer",
            EntryBody::Concrete { qtype, .. } => qtype.qtype(),
        }
    }

    pub fn answers(&self) -> &[BankAnswer] {
        match &self.body {
            EntryBody::MultiAnswer { .. } => &[],
            EntryBody::Concrete { answers, .. } => answers,
        }
    }

    pub fn parent(&self) -> Option<EntryRef> {
        match &self.body {
            EntryBody::MultiAnswer { .. } => None,
            EntryBody::Concrete { parent, .. } => Some(*parent),
        }
    }
}

/// A question lowered into its bank tree
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredQuestion {
    pub cloze: String,
    pub parent: BankEntry,
    pub child: BankEntry,
}

fn fraction(correct: bool) -> f64 {
    if correct {
        1.0
    } else {
        0.0
    }
}

fn build_answers(question: &Question, ids: &mut IdAllocator) -> Vec<BankAnswer> {
    match &question.kind {
        QuestionKind::Multichoice {
            options,
            correct,
            feedback,
        } => options
            .iter()
            .enumerate()
            .map(|(i, option)| BankAnswer {
                id: ids.allocate(IdClass::Answer),
                text: option.clone(),
                fraction: fraction(correct.contains(&i)),
                feedback: feedback.get(i).cloned().unwrap_or_default(),
                tolerance: None,
            })
            .collect(),
        QuestionKind::Numerical {
            answer,
            tolerance,
            feedback,
        } => vec![BankAnswer {
            id: ids.allocate(IdClass::Answer),
            text: answer.to_string(),
            fraction: 1.0,
            feedback: feedback.clone(),
            tolerance: Some(*tolerance),
        }],
        QuestionKind::Shortanswer { answers, feedback } => answers
            .iter()
            .map(|a| BankAnswer {
                id: ids.allocate(IdClass::Answer),
                text: a.clone(),
                fraction: 1.0,
                feedback: feedback.clone(),
                tolerance: None,
            })
            .collect(),
    }
}

/// Lower an already validated question into its parent/child bank entries.
///
/// `ordinal` is the 1-based position of the question inside its quiz.
pub fn lower(
    question: &Question,
    ordinal: usize,
    sequence: &mut LocalSequence,
    ids: &mut IdAllocator,
) -> LoweredQuestion {
    let cloze = encode_cloze(question);
    let name = question
        .name
        .clone()
        .unwrap_or_else(|| format!("Question {}", ordinal));

    let parent_ref = EntryRef {
        key: sequence.next_key(),
        question_id: ids.allocate(IdClass::Question),
    };
    let child_ref = EntryRef {
        key: sequence.next_key(),
        question_id: ids.allocate(IdClass::Question),
    };

    let parent = BankEntry {
        key: parent_ref.key,
        question_id: parent_ref.question_id,
        name: name.clone(),
        question_text: format!("{}\n<p>{{#1}}</p>", question.prompt),
        general_feedback: question.general_feedback.clone(),
        body: EntryBody::MultiAnswer {
            subquestion: child_ref,
        },
    };

    let child = BankEntry {
        key: child_ref.key,
        question_id: child_ref.question_id,
        name,
        question_text: cloze.clone(),
        general_feedback: String::new(),
        body: EntryBody::Concrete {
            qtype: question.question_type(),
            parent: parent_ref,
            answers: build_answers(question, ids),
        },
    };

    LoweredQuestion {
        cloze,
        parent,
        child,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_multichoice_cloze() {
        let q = Question::multichoice("Capital of France?", strings(&["Paris", "Lyon"]), vec![0])
            .with_feedback(strings(&["Yes", "No"]));
        assert_eq!(encode_cloze(&q), "{1:MULTICHOICE:=Paris#Yes~Lyon#No}");
    }

    #[test]
    fn test_multichoice_cloze_correct_not_first() {
        let q = Question::multichoice("Pick", strings(&["a", "b", "c"]), vec![1, 2]);
        assert_eq!(encode_cloze(&q), "{1:MULTICHOICE:~a~=b~=c}");
    }

    #[test]
    fn test_numerical_cloze_tolerance() {
        let exact = Question::numerical("6 x 7?", 42.0, 0.0);
        assert_eq!(encode_cloze(&exact), "{1:NUMERICAL:=42}");

        let approx = Question::numerical("seven quarters?", 1.75, 0.01).with_feedback(strings(&["Close"]));
        assert_eq!(encode_cloze(&approx), "{1:NUMERICAL:=1.75:0.01#Close}");
    }

    #[test]
    fn test_shortanswer_cloze() {
        let q = Question::shortanswer("Spell it", strings(&["colour", "color"]));
        assert_eq!(encode_cloze(&q), "{1:SHORTANSWER:=colour~=color}");
    }

    #[test]
    fn test_cloze_escaping() {
        assert_eq!(escape_cloze(r#"a}b#c~d/e"f\g"#), r#"a\}b\#c\~d\/e\"f\\g"#);
        let q = Question::multichoice("Pick", strings(&["1/2", "~x"]), vec![0]);
        assert_eq!(encode_cloze(&q), r"{1:MULTICHOICE:=1\/2~\~x}");
    }

    #[test]
    fn test_leading_grade_marker_in_option_is_escaped() {
        let mut ids = IdAllocator::new();
        let mut seq = LocalSequence::new(4);
        let q = Question::multichoice("2 + 2?", strings(&["=4", "5", "%50%x"]), vec![1]);
        assert!(q.validate().is_ok());
        let lowered = lower(&q, 1, &mut seq, &mut ids);

        assert_eq!(lowered.cloze, r"{1:MULTICHOICE:~\=4~=5~\%50%x}");
        let fractions: Vec<f64> = lowered.child.answers().iter().map(|a| a.fraction).collect();
        assert_eq!(fractions, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_validation_rejects_malformed_options() {
        let cases = vec![
            Question::multichoice("", strings(&["a", "b"]), vec![0]),
            Question::multichoice("q", strings(&["a"]), vec![0]),
            Question::multichoice("q", strings(&["a", " "]), vec![0]),
            Question::multichoice("q", strings(&["a", "b"]), vec![]),
            Question::multichoice("q", strings(&["a", "b"]), vec![2]),
            Question::multichoice("q", strings(&["a", "b"]), vec![0])
                .with_feedback(strings(&["only one"])),
            Question::numerical("q", f64::NAN, 0.0),
            Question::numerical("q", 1.0, -0.5),
            Question::shortanswer("q", vec![]),
            Question::shortanswer("q", strings(&["ok", ""])),
        ];

        for q in cases {
            let err = q.validate().unwrap_err();
            assert!(matches!(err, MbzError::Validation(_)), "{:?}", q);
        }
    }

    #[test]
    fn test_multiple_correct_each_full_credit() {
        let mut ids = IdAllocator::new();
        let mut seq = LocalSequence::new(3);
        let q = Question::multichoice("Primes", strings(&["2", "3", "4"]), vec![0, 1]);
        let lowered = lower(&q, 1, &mut seq, &mut ids);

        let fractions: Vec<f64> = lowered.child.answers().iter().map(|a| a.fraction).collect();
        assert_eq!(fractions, vec![1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_lowering_links_parent_and_child() {
        let mut ids = IdAllocator::new();
        let mut seq = LocalSequence::new(7);
        let q = Question::multichoice("Capital?", strings(&["Paris", "Lyon"]), vec![0])
            .with_general_feedback("Paris it is");

        let lowered = lower(&q, 1, &mut seq, &mut ids);

        assert_eq!(lowered.parent.qtype(), "multianswer");
        assert_eq!(lowered.child.qtype(), "multichoice");
        assert_eq!(lowered.parent.key, EntryKey { quiz_id: 7, local_seq: 1 });
        assert_eq!(lowered.child.key, EntryKey { quiz_id: 7, local_seq: 2 });
        assert_eq!(lowered.parent.key.flat_id(), 7001);
        assert_eq!(lowered.child.question_text, lowered.cloze);
        assert!(lowered.parent.question_text.contains("{#1}"));
        assert_eq!(lowered.parent.name, "Question 1");

        match &lowered.parent.body {
            EntryBody::MultiAnswer { subquestion } => {
                assert_eq!(subquestion.key, lowered.child.key);
                assert_eq!(subquestion.question_id, lowered.child.question_id);
            }
            other => panic!("unexpected body {:?}", other),
        }
        let parent = lowered.child.parent().unwrap();
        assert_eq!(parent.key, lowered.parent.key);
        assert_eq!(parent.question_id, lowered.parent.question_id);
    }

    #[test]
    fn test_stride_boundary() {
        let mut seq = LocalSequence::new(1);
        let keys: Vec<EntryKey> = (0..BANK_ENTRY_STRIDE + 1).map(|_| seq.next_key()).collect();
        let next_quiz_first = LocalSequence::new(2).next_key().flat_id();

        // sequence 1000 still fits: the next quiz starts at 2001
        assert_eq!(keys[999].flat_id(), 2000);
        assert_ne!(keys[999].flat_id(), next_quiz_first);
        assert_eq!(keys[1000].flat_id(), next_quiz_first);
    }

    #[test]
    fn test_local_sequence_is_per_quiz() {
        let mut ids = IdAllocator::new();
        let q = Question::numerical("n", 1.0, 0.0);

        let mut first = LocalSequence::new(1);
        lower(&q, 1, &mut first, &mut ids);
        let second_in_first = lower(&q, 2, &mut first, &mut ids);

        let mut other = LocalSequence::new(2);
        let first_in_other = lower(&q, 1, &mut other, &mut ids);

        assert_eq!(second_in_first.parent.key.local_seq, 3);
        assert_eq!(first_in_other.parent.key.local_seq, 1);
        // Global question ids keep counting across quizzes
        assert_eq!(first_in_other.parent.question_id, 5);
    }

    #[test]
    fn test_question_kind_from_toml() {
        let q: Question = toml::from_str(
            r#"
            type = "multichoice"
            prompt = "Capital?"
            options = ["Paris", "Lyon"]
            correct = [0]
            "#,
        )
        .unwrap();
        assert_eq!(q.question_type(), QuestionType::Multichoice);
        assert!(q.validate().is_ok());
    }

    fn arb_question() -> impl Strategy<Value = Question> {
        prop_oneof![
            (2usize..6).prop_flat_map(|n| {
                (
                    proptest::collection::vec("[a-z]{1,6}", n),
                    proptest::collection::btree_set(0..n, 1..=n),
                )
            })
            .prop_map(|(options, correct)| {
                Question::multichoice("prompt", options, correct.into_iter().collect())
            }),
            (-1000.0f64..1000.0, 0.0f64..5.0)
                .prop_map(|(answer, tol)| Question::numerical("prompt", answer, tol)),
            proptest::collection::vec("[a-z]{1,6}", 1..4)
                .prop_map(|answers| Question::shortanswer("prompt", answers)),
        ]
    }

    proptest! {
        #[test]
        fn prop_every_lowered_question_is_solvable(q in arb_question()) {
            prop_assert!(q.validate().is_ok());
            let mut ids = IdAllocator::new();
            let mut seq = LocalSequence::new(1);
            let lowered = lower(&q, 1, &mut seq, &mut ids);

            let answers = lowered.child.answers();
            prop_assert!(answers.iter().any(|a| a.fraction == 1.0));
            prop_assert!(answers.iter().all(|a| a.fraction == 1.0 || a.fraction == 0.0));
            prop_assert!(lowered.cloze.starts_with("{1:"), "cloze prefix: {}", lowered.cloze);
            prop_assert!(lowered.cloze.ends_with('}'), "cloze suffix: {}", lowered.cloze);
        }
    }
}
