use msbasic::config::Config;
use msbasic::interpreter::{Interpreter, RunOutcome};
use msbasic::io::VecIo;

fn run_program(lines: &[(u16, &str)]) -> (RunOutcome, String) {
    let mut interp = Interpreter::new(Config::default());
    for (number, source) in lines {
        interp.store_line(*number, source).expect("line should tokenize");
    }
    let mut io = VecIo::default();
    let outcome = interp.run(&mut io, None);
    (outcome, io.output)
}

fn assert_ended(outcome: RunOutcome) {
    match outcome {
        RunOutcome::Ended => {}
        RunOutcome::Stopped(line) => panic!("expected normal end, program stopped at {line:?}"),
        RunOutcome::Error { error, line } => panic!("expected normal end, got {error:?} at {line:?}"),
    }
}

#[test]
fn for_next_computes_a_factorial() {
    let (outcome, output) = run_program(&[
        (10, "N=5"),
        (20, "F=1"),
        (30, "FOR I=1 TO N"),
        (40, "F=F*I"),
        (50, "NEXT I"),
        (60, "PRINT F"),
    ]);
    assert_ended(outcome);
    assert_eq!(output, " 120 \n");
}

#[test]
fn nested_gosub_returns_in_order() {
    let (outcome, output) = run_program(&[
        (10, "GOSUB 100"),
        (20, "PRINT \"DONE\""),
        (30, "END"),
        (100, "PRINT \"A\""),
        (110, "GOSUB 200"),
        (120, "PRINT \"B\""),
        (130, "RETURN"),
        (200, "PRINT \"C\""),
        (210, "RETURN"),
    ]);
    assert_ended(outcome);
    assert_eq!(output, "A\nC\nB\nDONE\n");
}

#[test]
fn on_goto_dispatches_to_the_selected_line() {
    let (outcome, output) = run_program(&[
        (10, "X=2"),
        (20, "ON X GOTO 100,200,300"),
        (30, "PRINT \"NONE\""),
        (40, "END"),
        (100, "PRINT \"ONE\":END"),
        (200, "PRINT \"TWO\":END"),
        (300, "PRINT \"THREE\":END"),
    ]);
    assert_ended(outcome);
    assert_eq!(output, "TWO\n");
}

#[test]
fn read_data_restore_replays_the_same_values() {
    let (outcome, output) = run_program(&[
        (10, "READ A,B"),
        (20, "PRINT A+B"),
        (30, "RESTORE"),
        (40, "READ C,D"),
        (50, "PRINT C*D"),
        (60, "DATA 3,4"),
    ]);
    assert_ended(outcome);
    assert_eq!(output, " 7 \n 12 \n");
}

#[test]
fn operator_precedence_matches_mixed_expression() {
    let (outcome, output) = run_program(&[(10, "PRINT 2+3*4^2-10/2")]);
    assert_ended(outcome);
    assert_eq!(output, " 45 \n");
}

#[test]
fn power_is_right_associative() {
    let (outcome, output) = run_program(&[(10, "PRINT 2^3^2")]);
    assert_ended(outcome);
    assert_eq!(output, " 512 \n");
}

#[test]
fn string_slicing_functions_agree_on_overlapping_substrings() {
    let (outcome, output) = run_program(&[
        (10, "A$=\"HELLO WORLD\""),
        (20, "PRINT LEFT$(A$,5)"),
        (30, "PRINT RIGHT$(A$,5)"),
        (40, "PRINT MID$(A$,7,5)"),
    ]);
    assert_ended(outcome);
    assert_eq!(output, "HELLO\nWORLD\nWORLD\n");
}

#[test]
fn division_by_zero_reports_the_line_it_happened_on() {
    let (outcome, _) = run_program(&[(10, "PRINT 1"), (20, "PRINT 1/0")]);
    match outcome {
        RunOutcome::Error { error, line } => {
            assert_eq!(error, msbasic::error::BasicError::DivisionByZero);
            assert_eq!(line, Some(20));
        }
        _ => panic!("expected a division-by-zero error, got a different outcome"),
    }
}

#[test]
fn undefined_goto_target_is_an_undefined_statement_error() {
    let (outcome, _) = run_program(&[(10, "GOTO 999")]);
    match outcome {
        RunOutcome::Error { error, .. } => assert_eq!(error, msbasic::error::BasicError::UndefinedStatement),
        _ => panic!("expected an undefined-statement error"),
    }
}
