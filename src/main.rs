use anyhow::Result;

use std::io::{stdin, stdout, Write};

use connect4_solver::*;

mod display;
use display::*;

#[derive(Copy, Clone, Eq, PartialEq)]
enum Controller {
    Human,
    Engine,
    Random,
}

fn choose_controller(player: usize) -> Result<Controller> {
    let stdin = stdin();
    loop {
        let mut buffer = String::new();
        print!("Is player {} human, engine or random? h/e/r: ", player);
        stdout().flush().expect("failed to flush to stdout!");
        stdin.read_line(&mut buffer)?;
        match buffer.to_lowercase().chars().next() {
            Some(_letter @ 'h') => return Ok(Controller::Human),
            Some(_letter @ 'e') => return Ok(Controller::Engine),
            Some(_letter @ 'r') => return Ok(Controller::Random),
            _ => println!("Unknown answer given"),
        }
    }
}

fn engine_move(board: &GameBoard) -> Result<usize> {
    println!("Engine is thinking...");
    stdout().flush().expect("Failed to flush to stdout!");

    // the opening book answers the first plies without a search
    if board.game.len() <= 2 {
        return Ok(best_column(&board.game, SearchLimits::default())?);
    }

    let solution = evaluate(&board.game, SearchLimits::default())?;
    let player = if board.player_one { 1 } else { 2 };
    match solution.evaluation {
        Evaluation::WinIn(plies) => {
            println!("Player {} can force a win within {} plies.", player, plies)
        }
        Evaluation::LossIn(plies) => println!(
            "Player {} loses within {} plies against perfect play.",
            player, plies
        ),
        Evaluation::Draw => println!("Player {} can at best force a draw.", player),
    }
    println!("Best move: {}", solution.column);
    Ok(solution.column)
}

fn main() -> Result<()> {
    let mut board = GameBoard::new();

    let stdin = stdin();

    println!("Welcome to Connect 4\n");

    let controllers = (choose_controller(1)?, choose_controller(2)?);

    // game loop
    loop {
        board.display().expect("Failed to draw board!");

        match board.state {
            GameState::Playing => {
                let controller = if board.player_one {
                    controllers.0
                } else {
                    controllers.1
                };

                let next_move = match controller {
                    Controller::Engine => {
                        // slow down play when no human is involved
                        if controllers.0 != Controller::Human
                            && controllers.1 != Controller::Human
                        {
                            std::thread::sleep(std::time::Duration::new(1, 0));
                        }
                        engine_move(&board)?
                    }
                    Controller::Random => {
                        let column = board
                            .snapshot()
                            .random_column(&mut rand::thread_rng())?;
                        println!("Random move: {}", column + 1);
                        column + 1
                    }
                    Controller::Human => {
                        print!("Move input > ");
                        stdout().flush().expect("Failed to flush to stdout!");
                        let mut input_str = String::new();
                        stdin.read_line(&mut input_str)?;

                        match input_str.trim().parse::<usize>() {
                            Err(_) => {
                                println!("Invalid number: {}", input_str);
                                continue;
                            }
                            Ok(column) => column,
                        }
                    }
                };

                if let Err(err) = board.play_checked(next_move) {
                    println!("{}", err);
                    // try the move again
                    continue;
                }
            }

            // end states
            GameState::PlayerOneWin => {
                println!("Player 1 wins!");
                break;
            }
            GameState::PlayerTwoWin => {
                println!("Player 2 wins!");
                break;
            }
            GameState::Draw => {
                println!("Draw!");
                break;
            }
        }
    }
    Ok(())
}
