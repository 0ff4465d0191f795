//! Line-oriented commands for driving a turn from a terminal.

use thiserror::Error;

use crate::api::GameOutcome;
use crate::error::ClientError;
use crate::model::{DieChoice, SectorId};
use crate::turn::{ActionOutcome, DiceBonusChoice, GameReview, RollPurpose, Surface, TurnMachine};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    Help,
    Roll,
    DiceBonus(DiceBonusChoice),
    Train(bool),
    Review(GameReview),
    Card,
    Steal,
    Drop,
    Continue,
    Tax(bool),
    Prison(bool),
    Reroll(bool),
    Build(SectorId),
    EnterPrison,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
status | roll | dice <1|2|-> <+1|-1|0> | train yes|no
review <completed|drop|reroll> <rating> <title...>
card | steal | drop | continue | tax use|skip | prison use|skip | reroll use|skip
build <sector> | prison | quit";

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Empty);
    };
    let rest: Vec<&str> = words.collect();
    let cmd = match (head.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("status" | "s", []) => Command::Status,
        ("help" | "?", []) => Command::Help,
        ("roll", []) => Command::Roll,
        ("dice", [die, adjust]) => Command::DiceBonus(DiceBonusChoice {
            selected_die: parse_die(die)?,
            adjust_by_1: parse_adjust(adjust)?,
        }),
        ("dice", _) => return Err(CommandError::Usage("dice <1|2|-> <+1|-1|0>")),
        ("train", [answer]) => Command::Train(yes_no(answer, "train yes|no")?),
        ("review", [outcome, rating, title @ ..]) if !title.is_empty() => {
            let outcome = match *outcome {
                "completed" => GameOutcome::Completed,
                "drop" => GameOutcome::Drop,
                "reroll" => GameOutcome::Reroll,
                _ => return Err(CommandError::Usage(REVIEW_USAGE)),
            };
            let rating = rating.parse::<f32>().map_err(|_| CommandError::Usage(REVIEW_USAGE))?;
            Command::Review(GameReview {
                title: title.join(" "),
                review: String::new(),
                rating,
                outcome,
                duration_secs: None,
            })
        }
        ("review", _) => return Err(CommandError::Usage(REVIEW_USAGE)),
        ("card", []) => Command::Card,
        ("steal", []) => Command::Steal,
        ("drop", []) => Command::Drop,
        ("continue" | "c", []) => Command::Continue,
        ("tax", [answer]) => Command::Tax(use_skip(answer, "tax use|skip")?),
        ("prison", []) => Command::EnterPrison,
        ("prison", [answer]) => Command::Prison(use_skip(answer, "prison use|skip")?),
        ("reroll", [answer]) => Command::Reroll(use_skip(answer, "reroll use|skip")?),
        ("build", [sector]) => {
            Command::Build(sector.parse().map_err(|_| CommandError::Usage("build <sector>"))?)
        }
        ("quit" | "exit" | "q", []) => Command::Quit,
        (other, _) => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(cmd)
}

const REVIEW_USAGE: &str = "review <completed|drop|reroll> <rating> <title...>";

fn parse_die(s: &str) -> Result<Option<DieChoice>, CommandError> {
    match s {
        "1" => Ok(Some(DieChoice::First)),
        "2" => Ok(Some(DieChoice::Second)),
        "-" => Ok(None),
        _ => Err(CommandError::Usage("dice <1|2|-> <+1|-1|0>")),
    }
}

fn parse_adjust(s: &str) -> Result<Option<i8>, CommandError> {
    match s {
        "+1" | "1" => Ok(Some(1)),
        "-1" => Ok(Some(-1)),
        "0" => Ok(None),
        _ => Err(CommandError::Usage("dice <1|2|-> <+1|-1|0>")),
    }
}

fn yes_no(s: &str, usage: &'static str) -> Result<bool, CommandError> {
    match s {
        "yes" | "y" => Ok(true),
        "no" | "n" => Ok(false),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn use_skip(s: &str, usage: &'static str) -> Result<bool, CommandError> {
    match s {
        "use" => Ok(true),
        "skip" => Ok(false),
        _ => Err(CommandError::Usage(usage)),
    }
}

/// Run one turn command. `Status`, `Help` and `Quit` are handled by the caller.
pub async fn dispatch(machine: &TurnMachine, cmd: Command) -> Result<Option<ActionOutcome>, ClientError> {
    let outcome = match cmd {
        Command::Status | Command::Help | Command::Quit => return Ok(None),
        Command::Roll => machine.roll_dice().await?,
        Command::DiceBonus(choice) => machine.apply_dice_bonuses(choice).await?,
        Command::Train(accept) => machine.choose_train_ride(accept).await?,
        Command::Review(review) => machine.submit_game_review(review).await?,
        Command::Card => machine.roll_bonus_card().await?,
        Command::Steal => machine.steal_bonus_card().await?,
        Command::Drop => machine.drop_bonus_card().await?,
        Command::Continue => machine.continue_without_cards().await?,
        Command::Tax(use_card) => machine.resolve_tax_bonus(use_card).await?,
        Command::Prison(use_card) => machine.resolve_prison_bonus(use_card).await?,
        Command::Reroll(use_card) => machine.resolve_reroll_bonus(use_card).await?,
        Command::Build(sector) => machine.choose_building_sector(sector).await?,
        Command::EnterPrison => machine.enter_prison().await?,
    };
    Ok(Some(outcome))
}

/// One-line prompt for the current surface.
pub fn describe(surface: &Surface) -> String {
    match surface {
        Surface::Hidden => "waiting".into(),
        Surface::RollDiceButton => "your turn: `roll`".into(),
        Surface::TrainRideDialog { route } => format!("train from {} to {}: `train yes|no`", route.from, route.to),
        Surface::NoTrainHere => "no train here: `train no`".into(),
        Surface::GameReviewForm { roll_type } => format!("{roll_type:?} game: `review <completed|drop|reroll> <rating> <title>`"),
        Surface::CardRoller { purpose, candidates } => {
            let verb = match purpose {
                RollPurpose::NewCard => "card",
                RollPurpose::Steal => "steal",
                RollPurpose::Lose(_) => "drop",
            };
            format!("{} candidates: `{verb}`", candidates.len())
        }
        Surface::NothingToRoll { .. } => "nothing to roll: `continue`".into(),
        Surface::LoseScoreInstead => "no cards to lose, score is taken instead: `continue`".into(),
        Surface::DiceBonusDialog { roll, cards } => {
            let dice = roll.as_ref().map(|r| format!("{:?}", r.data)).unwrap_or_else(|| "?".into());
            let cards: Vec<&str> = cards.iter().map(|c| c.as_str()).collect();
            format!("rolled {dice}, cards [{}]: `dice <1|2|-> <+1|-1|0>`", cards.join(", "))
        }
        Surface::TaxBonusDialog { tax, card_available } => {
            format!("{tax:?} tax, card available: {card_available}: `tax use|skip`")
        }
        Surface::PrisonBonusDialog { card_available } => format!("prison, card available: {card_available}: `prison use|skip`"),
        Surface::RerollBonusDialog { card_available } => format!("reroll, card available: {card_available}: `reroll use|skip`"),
        Surface::BuildingSectorPicker { options } => format!("{} sectors to build on: `build <sector>`", options.len()),
        Surface::EnterPrisonDialog => "off to prison: `prison`".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse("roll").unwrap(), Command::Roll);
        assert_eq!(parse("  Continue ").unwrap(), Command::Continue);
        assert_eq!(parse("prison").unwrap(), Command::EnterPrison);
        assert_eq!(parse("prison use").unwrap(), Command::Prison(true));
        assert_eq!(parse("train no").unwrap(), Command::Train(false));
        assert_eq!(parse("build 12").unwrap(), Command::Build(12));
    }

    #[test]
    fn parses_dice_bonus() {
        assert_eq!(
            parse("dice 2 -1").unwrap(),
            Command::DiceBonus(DiceBonusChoice { selected_die: Some(DieChoice::Second), adjust_by_1: Some(-1) })
        );
        assert_eq!(parse("dice - 0").unwrap(), Command::DiceBonus(DiceBonusChoice::default()));
        assert!(matches!(parse("dice 3 0"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn parses_review_with_multiword_title() {
        let Command::Review(review) = parse("review drop 4.5 Hollow Knight").unwrap() else {
            panic!("expected review");
        };
        assert_eq!(review.title, "Hollow Knight");
        assert_eq!(review.outcome, GameOutcome::Drop);
        assert_eq!(review.rating, 4.5);
        assert!(matches!(parse("review done 5 X"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("review completed 5"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse("   "), Err(CommandError::Empty));
        assert_eq!(parse("fly"), Err(CommandError::Unknown("fly".into())));
        assert!(matches!(parse("tax maybe"), Err(CommandError::Usage(_))));
    }
}
