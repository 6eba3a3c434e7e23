//! Bluffer: a trivia game where players invent fake answers to fool each other.
//!
//! Each round has two stages. First every player answers the question in
//! free text. Then all distinct answers plus the real one are shuffled into a
//! ballot and every player votes for the answer they believe is real.
//!
//! Scoring per vote:
//! - picking the real answer earns the voter [`CORRECT_POINTS`]
//! - every player who originally submitted the picked answer, other than the
//!   voter, earns [`BLUFF_POINTS`]

use crate::game::{broadcast, Game, GameError, GameStatus};
use crate::questions::{Question, QuestionBank};
use crate::user::User;
use log::{error, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shared::{system_reply, CommandResult, Message, ASKCHOICES, ASKTXT, GAMEMSG};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

pub const NAME: &str = "bluffer";

/// Questions asked before the game ends
pub const ROUNDS: usize = 3;
pub const CORRECT_POINTS: i32 = 10;
pub const BLUFF_POINTS: i32 = 5;

/// Returns a registry constructor that reloads the bank from `questions`
/// for every new game.
pub fn constructor(
    questions: PathBuf,
) -> impl Fn(&[Arc<User>]) -> Result<Box<dyn Game>, GameError> + Send + Sync + 'static {
    move |players: &[Arc<User>]| {
        let bank = QuestionBank::load(&questions)?;
        Ok(Box::new(Bluffer::new(bank, players)?) as Box<dyn Game>)
    }
}

/// Question waiting for free-text answers.
#[derive(Debug)]
struct OpenQuestion {
    text: String,
    correct_answer: String,
    /// (nickname, lowercased answer) in submission order
    answers: Vec<(String, String)>,
}

impl OpenQuestion {
    fn new(question: Question) -> Self {
        Self {
            text: question.text,
            correct_answer: question.answer.to_lowercase(),
            answers: Vec::new(),
        }
    }

    fn has_answered(&self, nickname: &str) -> bool {
        self.answers.iter().any(|(nick, _)| nick == nickname)
    }

    fn add_answer(&mut self, nickname: &str, answer: &str) -> bool {
        if self.has_answered(nickname) {
            return false;
        }
        self.answers
            .push((nickname.to_string(), answer.to_lowercase()));
        true
    }

    /// Builds the shuffled ballot: distinct submitted answers plus the real one.
    fn into_ballot(self, rng: &mut StdRng) -> BallotQuestion {
        let mut texts: Vec<String> = Vec::new();
        for (_, answer) in &self.answers {
            if !texts.contains(answer) {
                texts.push(answer.clone());
            }
        }
        if !texts.contains(&self.correct_answer) {
            texts.push(self.correct_answer.clone());
        }
        texts.shuffle(rng);

        let correct_index = texts
            .iter()
            .position(|text| *text == self.correct_answer)
            .unwrap_or_default();

        let choices = texts
            .into_iter()
            .map(|text| {
                let submitters = self
                    .answers
                    .iter()
                    .filter(|(_, answer)| *answer == text)
                    .map(|(nick, _)| nick.clone())
                    .collect();
                Choice { text, submitters }
            })
            .collect();

        BallotQuestion {
            choices,
            correct_index,
            correct_answer: self.correct_answer,
            voters: HashSet::new(),
        }
    }
}

#[derive(Debug)]
struct Choice {
    text: String,
    submitters: Vec<String>,
}

/// Multiple-choice stage of a round.
#[derive(Debug)]
struct BallotQuestion {
    choices: Vec<Choice>,
    correct_index: usize,
    correct_answer: String,
    voters: HashSet<String>,
}

impl BallotQuestion {
    fn prompt(&self) -> String {
        self.choices
            .iter()
            .enumerate()
            .map(|(index, choice)| format!("{}.{}", index, choice.text))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn submitters(&self, choice: usize) -> Option<&[String]> {
        self.choices
            .get(choice)
            .map(|choice| choice.submitters.as_slice())
    }

    fn has_voted(&self, nickname: &str) -> bool {
        self.voters.contains(nickname)
    }
}

#[derive(Debug)]
enum Stage {
    AwaitingText(OpenQuestion),
    AwaitingChoice(BallotQuestion),
    Finished,
}

pub struct Bluffer {
    bank: QuestionBank,
    /// Texts of the questions asked so far; its length is the round number
    asked: Vec<String>,
    scores: HashMap<String, i32>,
    stage: Stage,
    rng: StdRng,
}

impl Bluffer {
    pub fn new(bank: QuestionBank, players: &[Arc<User>]) -> Result<Self, GameError> {
        Self::with_rng(bank, players, StdRng::from_entropy())
    }

    /// Creates a game and selects the first question. Fails if the bank
    /// cannot supply a full game.
    pub fn with_rng(
        bank: QuestionBank,
        players: &[Arc<User>],
        mut rng: StdRng,
    ) -> Result<Self, GameError> {
        let available = bank.distinct_len();
        if available < ROUNDS {
            return Err(GameError::NotEnoughQuestions {
                needed: ROUNDS,
                available,
            });
        }

        let first = bank
            .pick(&[], &mut rng)
            .ok_or(GameError::NotEnoughQuestions {
                needed: ROUNDS,
                available,
            })?;

        let scores = players
            .iter()
            .map(|player| (player.nickname().to_string(), 0))
            .collect();

        Ok(Self {
            bank,
            asked: vec![first.text.clone()],
            scores,
            stage: Stage::AwaitingText(OpenQuestion::new(first)),
            rng,
        })
    }

    pub fn round(&self) -> usize {
        self.asked.len()
    }

    pub fn score(&self, nickname: &str) -> i32 {
        self.scores.get(nickname).copied().unwrap_or_default()
    }

    fn award(&mut self, nickname: &str, points: i32) {
        *self.scores.entry(nickname.to_string()).or_insert(0) += points;
    }

    /// Advances the stage once every current player has submitted.
    fn check_progress(&mut self, players: &[Arc<User>]) -> GameStatus {
        let complete = match &self.stage {
            Stage::AwaitingText(question) => players
                .iter()
                .all(|player| question.has_answered(player.nickname())),
            Stage::AwaitingChoice(ballot) => players
                .iter()
                .all(|player| ballot.has_voted(player.nickname())),
            Stage::Finished => return GameStatus::Finished,
        };

        if !complete {
            return GameStatus::InProgress;
        }

        match std::mem::replace(&mut self.stage, Stage::Finished) {
            Stage::AwaitingText(question) => {
                let ballot = question.into_ballot(&mut self.rng);
                broadcast(players, &Message::new(ASKCHOICES, ballot.prompt()));
                self.stage = Stage::AwaitingChoice(ballot);
                GameStatus::InProgress
            }
            _ => self.next_round(players),
        }
    }

    fn next_round(&mut self, players: &[Arc<User>]) -> GameStatus {
        if self.asked.len() >= ROUNDS {
            self.finish(players);
            return GameStatus::Finished;
        }

        match self.bank.pick(&self.asked, &mut self.rng) {
            Some(question) => {
                self.asked.push(question.text.clone());
                broadcast(players, &Message::new(ASKTXT, question.text.as_str()));
                self.stage = Stage::AwaitingText(OpenQuestion::new(question));
                GameStatus::InProgress
            }
            None => {
                error!(
                    "Question bank ran out after {} rounds, ending game",
                    self.asked.len()
                );
                broadcast(
                    players,
                    &Message::new(GAMEMSG, "No more questions available, the game is over"),
                );
                self.finish(players);
                GameStatus::Finished
            }
        }
    }

    fn finish(&mut self, players: &[Arc<User>]) {
        let summary = players
            .iter()
            .map(|player| format!("{}: {}", player.nickname(), self.score(player.nickname())))
            .collect::<Vec<_>>()
            .join(" ");
        broadcast(players, &Message::new(GAMEMSG, format!("Summary: {}", summary)));
        info!("Bluffer finished after {} rounds", self.asked.len());
        self.stage = Stage::Finished;
    }
}

impl Game for Bluffer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn begin(&mut self, players: &[Arc<User>]) {
        if let Stage::AwaitingText(question) = &self.stage {
            broadcast(players, &Message::new(ASKTXT, question.text.as_str()));
        }
    }

    fn handle_text_response(
        &mut self,
        user: &User,
        text: &str,
        players: &[Arc<User>],
    ) -> Result<GameStatus, GameError> {
        let question = match &mut self.stage {
            Stage::AwaitingText(question) => question,
            _ => return Err(GameError::UnexpectedTextResponse),
        };

        if !question.add_answer(user.nickname(), text) {
            return Err(GameError::AlreadyAnswered(user.nickname().to_string()));
        }

        user.send(system_reply("TXTRESP", CommandResult::Accepted, ""));
        Ok(self.check_progress(players))
    }

    fn handle_select_response(
        &mut self,
        user: &User,
        choice: usize,
        players: &[Arc<User>],
    ) -> Result<GameStatus, GameError> {
        let nickname = user.nickname();

        let (submitters, correct_index, correct_answer) = {
            let ballot = match &mut self.stage {
                Stage::AwaitingChoice(ballot) => ballot,
                _ => return Err(GameError::UnexpectedSelectResponse),
            };
            let submitters = ballot
                .submitters(choice)
                .ok_or(GameError::InvalidChoice(choice))?
                .to_vec();
            if !ballot.voters.insert(nickname.to_string()) {
                return Err(GameError::AlreadyVoted(nickname.to_string()));
            }
            (submitters, ballot.correct_index, ballot.correct_answer.clone())
        };

        user.send(system_reply("SELECTRESP", CommandResult::Accepted, ""));
        user.send(Message::new(
            GAMEMSG,
            format!("The correct answer is: {}", correct_answer),
        ));

        if choice == correct_index {
            self.award(nickname, CORRECT_POINTS);
            user.send(Message::new(GAMEMSG, format!("correct! +{}pts", CORRECT_POINTS)));
        } else {
            user.send(Message::new(GAMEMSG, "wrong! +0pts"));
        }

        for submitter in submitters.iter().filter(|s| s.as_str() != nickname) {
            self.award(submitter, BLUFF_POINTS);
        }

        Ok(self.check_progress(players))
    }

    fn handle_departure(&mut self, _nickname: &str, players: &[Arc<User>]) -> GameStatus {
        self.check_progress(players)
    }
}
