use parloop::FixtureKind;
use std::process::ExitCode;

fn main() -> ExitCode {
    parloop::fixture_main(FixtureKind::AddArrays)
}
