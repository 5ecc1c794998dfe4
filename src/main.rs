use std::process::ExitCode;

use tome_agent::{
    app_state::AppState,
    config::Config,
    errors::AppResult,
    models::{
        domain::KnowledgeCoordinates,
        dto::{AnswerRatingDto, GeneratedQuestionsDto},
    },
};

const USAGE: &str = "usage: tome-agent <topic> <section> [question_count]
       tome-agent <topic> <section> --rate <question> <answer>";

enum Command {
    Generate(Option<usize>),
    Rate { question: String, answer: String },
}

fn parse_args(args: &[String]) -> Option<(KnowledgeCoordinates, Command)> {
    let (topic, section, rest) = match args {
        [topic, section, rest @ ..] => (topic, section, rest),
        _ => return None,
    };
    let coordinates = KnowledgeCoordinates::new(topic.as_str(), section.as_str());

    let command = match rest {
        [] => Command::Generate(None),
        [count] => Command::Generate(Some(count.parse().ok()?)),
        [flag, question, answer] if flag == "--rate" => Command::Rate {
            question: question.clone(),
            answer: answer.clone(),
        },
        _ => return None,
    };
    Some((coordinates, command))
}

async fn run(state: &AppState, coordinates: &KnowledgeCoordinates, command: Command) -> AppResult<String> {
    let json = match command {
        Command::Generate(count) => {
            let result = state.start_quiz(coordinates, count).await?;
            serde_json::to_string_pretty(&GeneratedQuestionsDto::from(result))?
        }
        Command::Rate { question, answer } => {
            let score = state.rate_answer(coordinates, &question, &answer).await?;
            serde_json::to_string_pretty(&AnswerRatingDto::from(score))?
        }
    };
    Ok(json)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((coordinates, command)) = parse_args(&args) else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    let config = Config::from_env();
    if let Err(e) = config.validate_for_production() {
        log::error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Failed to start quiz agent: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&state, &coordinates, command).await {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let Some(rationale) = e.rationale() {
                log::info!("Rationale before failure:\n{}", rationale);
            }
            log::error!("{} ({})", e, e.error_code());
            ExitCode::FAILURE
        }
    }
}
