use assert_cmd::Command;
use predicates::{prelude::*, str::contains};
use tempfile::tempdir;

fn cli(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("cardledger_cli").unwrap();
    cmd.env("CARDLEDGER_HOME", home).env("RUST_LOG", "off");
    cmd
}

#[test]
fn script_mode_books_installment_invoices() {
    let home = tempdir().unwrap();
    let input = "\
account-add Checking checking
card-add Gold 5000 5 15 Checking
purchase Gold \"Laptop\" 100.00 2024-01-10 3
charges Gold
statement Gold 03/2024
exit
";

    cli(home.path())
        .env("CARDLEDGER_CLI_SCRIPT", "1")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Laptop (1/3)"))
        .stdout(contains("02/2024  33.33  due 2024-02-15  Invoice Gold - 02/2024"))
        .stdout(contains("04/2024  33.34  due 2024-04-15  Invoice Gold - 04/2024"))
        .stdout(contains("Gold 03/2024: closes 2024-03-05 due 2024-03-15"))
        .stdout(contains("Total 33.33"));

    let book = std::fs::read_to_string(home.path().join("books").join("book.json")).unwrap();
    assert!(book.contains("\"Invoice Gold - 03/2024\""));
}

#[test]
fn state_persists_between_invocations() {
    let home = tempdir().unwrap();
    cli(home.path())
        .args(["account-add", "Checking"])
        .assert()
        .success();
    cli(home.path())
        .args(["card-add", "Gold", "5000", "5", "15", "checking"])
        .assert()
        .success();
    cli(home.path())
        .args(["purchase", "gold", "Coffee", "4.50", "2024-06-01"])
        .assert()
        .success();

    cli(home.path())
        .args(["charges", "Gold"])
        .assert()
        .success()
        .stdout(contains("06/2024  4.50  due 2024-06-15"));
}

#[test]
fn failing_commands_exit_with_an_error() {
    let home = tempdir().unwrap();

    cli(home.path())
        .args(["card-add", "Gold", "5000", "29", "15"])
        .assert()
        .failure()
        .stderr(contains("closing day must be between 1 and 28"));

    cli(home.path())
        .assert()
        .failure()
        .stderr(contains("Usage: cardledger_cli"));

    cli(home.path())
        .args(["charges", "Ghost"])
        .assert()
        .failure()
        .stderr(contains("no card matches").and(contains("Ghost")));
}

#[test]
fn absurd_installment_counts_fail_cleanly() {
    let home = tempdir().unwrap();
    cli(home.path())
        .args(["card-add", "Gold", "5000", "5", "15"])
        .assert()
        .success();

    cli(home.path())
        .args(["purchase", "Gold", "TV", "10.00", "2024-01-01", "4294967295"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("outside the supported calendar"));
}
