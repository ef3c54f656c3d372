use std::{ops::ControlFlow, process::ExitCode, time::Duration};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use npuzzle_solver::{format_moves, Board, Problem, Solver, DEFAULT_MAX_ITERATIONS};

// Rows are separated by newlines or '/', cells by spaces or commas.
// 0, _ or . marks the empty cell.
const EXAMPLES: &[(&str, &str)] = &[
    (
        "
1 2 3
5 _ 6
4 7 8
",
        "
1 2 3
4 5 6
7 8 _
",
    ),
    (
        "
_ 1 3
4 2 5
7 8 6
",
        "
1 2 3
4 5 6
7 8 _
",
    ),
    (
        "
 1  2  3  4
 5  6  _  8
 9 10  7 11
13 14 15 12
",
        "
 1  2  3  4
 5  6  7  8
 9 10 11 12
13 14 15  _
",
    ),
    (
        "
2 1
3 _
",
        "
1 2
3 _
",
    ),
];

#[derive(Parser, Debug)]
#[command(
    name = "npuzzle-solver",
    version,
    about = "Solve N×N sliding-tile puzzles with A*"
)]
struct Cli {
    /// Start board, e.g. "1,2,3/5,0,6/4,7,8". Runs built-in examples if omitted
    #[arg(short, long, value_name = "BOARD")]
    start: Option<Board>,
    /// Goal board; defaults to tiles in order with the empty cell last
    #[arg(short, long, value_name = "BOARD")]
    goal: Option<Board>,
    /// Give up after expanding this many boards
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,
    /// Show a spinner while searching
    #[arg(long)]
    progress: bool,
}

fn run(solver: &Solver, problem: &Problem, progress: bool) -> bool {
    println!("----");
    println!("Source:");
    println!("{}", problem.start());
    println!("----");
    println!("Target:");
    println!("{}", problem.goal());
    println!("----");

    if !problem.start().can_reach(problem.goal()) {
        println!("Warning: tile parity says the target is unreachable");
    }

    let result = if progress {
        let pb = ProgressBar::new_spinner();
        let template = "{spinner:.green} [{elapsed_precise}] {msg}";
        if let Ok(style) = ProgressStyle::with_template(template) {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        let result = solver.solve_with(problem, |stats| {
            if stats.iterations % 256 == 0 {
                pb.set_message(format!(
                    "{} expanded, {} generated",
                    stats.iterations, stats.generated
                ));
            }
            ControlFlow::Continue(())
        });
        pb.finish_and_clear();
        result
    } else {
        solver.solve(problem)
    };

    println!("{}", result.message());
    println!(
        "Expanded {} board positions (generated {} total, peak frontier {}).",
        result.stats.iterations, result.stats.generated, result.stats.peak_frontier
    );
    if !result.solution().is_empty() {
        println!("Moves: {}", format_moves(result.solution()));
    }
    println!();

    result.success()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let solver = Solver::new().with_max_iterations(cli.max_iterations);

    let from_examples = cli.start.is_none();

    let problems: Vec<Problem> = match cli.start {
        Some(start) => match cli.goal {
            Some(goal) => vec![Problem::new(start, goal)],
            None => vec![Problem::to_solved(start)],
        },
        None => {
            let mut problems = Vec::new();
            for (source, dest) in EXAMPLES {
                match (source.parse::<Board>(), dest.parse::<Board>()) {
                    (Ok(start), Ok(goal)) => problems.push(Problem::new(start, goal)),
                    (Err(e), _) | (_, Err(e)) => {
                        eprintln!("error: bad built-in example: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            problems
        }
    };

    let mut all_solved = true;
    for problem in &problems {
        all_solved &= run(&solver, problem, cli.progress);
    }

    // the built-in list deliberately ends with an unreachable target
    if all_solved || from_examples {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
