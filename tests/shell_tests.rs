//! Integration tests for the interactive shell, driven by a scripted
//! `Prompter` instead of a terminal.

use std::collections::VecDeque;

use encrypto::cli::prompt::Prompter;
use encrypto::cli::shell::{Screen, Shell};
use encrypto::config::Settings;
use encrypto::crypto::{CredentialHasher, HasherParams, VaultKey};
use encrypto::errors::{Result, VaultError};
use encrypto::session::SessionState;
use encrypto::vault::VaultStore;
use zeroize::Zeroizing;

#[derive(Debug)]
enum Answer {
    Pick(usize),
    Text(&'static str),
    Secret(&'static str),
    Yes,
    No,
    Enter,
}

/// Replays canned answers; running past the end of the script is an error.
///
/// `login_secret` stands in for a password supplied from the environment:
/// when set it answers the login prompt and nothing else.
struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    login_secret: Option<&'static str>,
}

impl ScriptedPrompter {
    fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            login_secret: None,
        }
    }

    fn with_login_secret(mut self, secret: &'static str) -> Self {
        self.login_secret = Some(secret);
        self
    }

    fn next(&mut self, wanted: &str) -> Result<Answer> {
        self.answers
            .pop_front()
            .ok_or_else(|| VaultError::CommandFailed(format!("script ended at {wanted}")))
    }

    fn unexpected(wanted: &str, got: Answer) -> VaultError {
        VaultError::CommandFailed(format!("expected {wanted}, script had {got:?}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&mut self, title: &str, items: &[&str]) -> Result<usize> {
        match self.next(title)? {
            Answer::Pick(i) if i < items.len() => Ok(i),
            other => Err(Self::unexpected(title, other)),
        }
    }

    fn input(&mut self, prompt: &str) -> Result<String> {
        match self.next(prompt)? {
            Answer::Text(s) => Ok(s.to_string()),
            other => Err(Self::unexpected(prompt, other)),
        }
    }

    fn password(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        match self.next(prompt)? {
            Answer::Secret(s) => Ok(Zeroizing::new(s.to_string())),
            other => Err(Self::unexpected(prompt, other)),
        }
    }

    fn login_password(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        match self.login_secret {
            Some(secret) => Ok(Zeroizing::new(secret.to_string())),
            None => self.password(prompt),
        }
    }

    fn confirm(&mut self, prompt: &str, _default: bool) -> Result<bool> {
        match self.next(prompt)? {
            Answer::Yes => Ok(true),
            Answer::No => Ok(false),
            other => Err(Self::unexpected(prompt, other)),
        }
    }

    fn pause(&mut self) -> Result<()> {
        match self.next("pause")? {
            Answer::Enter => Ok(()),
            other => Err(Self::unexpected("pause", other)),
        }
    }
}

use Answer::*;

fn store() -> VaultStore {
    let hasher = CredentialHasher::new(HasherParams::minimum()).unwrap();
    VaultStore::open_in_memory(VaultKey::generate(), hasher).unwrap()
}

/// Start screen: sign up alice, then log in.
fn sign_up_and_log_in() -> Vec<Answer> {
    vec![
        Pick(0),
        Text("alice"),
        Secret("Passw0rd!"),
        Secret("Passw0rd!"),
        Pick(1),
        Text("alice"),
        Secret("Passw0rd!"),
    ]
}

/// Main menu: quit and confirm.
fn quit_from_menu() -> Vec<Answer> {
    vec![Pick(6), Yes]
}

fn run_script(vault: &mut VaultStore, script: Vec<Answer>) -> Result<()> {
    let settings = Settings::default();
    let mut shell = Shell::new(vault, &settings, None, ScriptedPrompter::new(script));
    shell.run()
}

#[test]
fn sign_up_log_in_and_store_a_password() {
    let mut vault = store();
    let mut script = sign_up_and_log_in();
    script.extend([
        Pick(1),
        Text("example.com"),
        Text("alice"),
        Pick(0),
        Secret("s3cr3t!"),
        Yes,
    ]);
    script.extend(quit_from_menu());

    run_script(&mut vault, script).unwrap();

    let alice = vault.authenticate("alice", "Passw0rd!").unwrap();
    let record = vault.find_record_by_site(&alice, "example.com").unwrap();
    assert_eq!(record.account_name, "alice");
    assert_eq!(vault.reveal(&alice, &record).unwrap().as_str(), "s3cr3t!");
}

#[test]
fn generated_password_is_stored_when_chosen() {
    let mut vault = store();
    let mut script = sign_up_and_log_in();
    script.extend([Pick(1), Text("bank"), Text("alice"), Pick(1), Yes]);
    script.extend(quit_from_menu());

    run_script(&mut vault, script).unwrap();

    let alice = vault.authenticate("alice", "Passw0rd!").unwrap();
    let record = vault.find_record_by_site(&alice, "bank").unwrap();
    let secret = vault.reveal(&alice, &record).unwrap();
    let settings = Settings::default();
    assert_eq!(secret.len(), settings.generator_length);
    assert!(settings.password_policy().is_satisfied_by(&secret));
}

#[test]
fn declined_confirmation_writes_nothing() {
    let mut vault = store();
    let mut script = sign_up_and_log_in();
    script.extend([
        Pick(1),
        Text("example.com"),
        Text("alice"),
        Pick(0),
        Secret("s3cr3t!"),
        No,
    ]);
    script.extend(quit_from_menu());

    run_script(&mut vault, script).unwrap();

    let alice = vault.authenticate("alice", "Passw0rd!").unwrap();
    assert!(vault.list_records(&alice).unwrap().is_empty());
}

#[test]
fn manage_update_view_and_delete() {
    let mut vault = store();
    let mut script = sign_up_and_log_in();
    script.extend([
        // create
        Pick(1),
        Text("example.com"),
        Text("alice"),
        Pick(0),
        Secret("old"),
        Yes,
        // manage -> update (one miss, then the right site)
        Pick(2),
        Pick(1),
        Text("nowhere.org"),
        Text("example.com"),
        Secret("new"),
        Yes,
        // view
        Pick(0),
        Enter,
        // search
        Pick(3),
        Text("EXAMPLE"),
        Enter,
        // back to menu
        Pick(4),
    ]);
    script.extend(quit_from_menu());
    run_script(&mut vault, script).unwrap();

    let alice = vault.authenticate("alice", "Passw0rd!").unwrap();
    let record = vault.find_record_by_site(&alice, "example.com").unwrap();
    assert_eq!(vault.reveal(&alice, &record).unwrap().as_str(), "new");

    let mut script = vec![Pick(1), Text("alice"), Secret("Passw0rd!")];
    script.extend([Pick(2), Pick(2), Text("example.com"), Yes, Pick(4)]);
    script.extend(quit_from_menu());
    run_script(&mut vault, script).unwrap();

    assert!(vault.list_records(&alice).unwrap().is_empty());
}

#[test]
fn rename_account_moves_records() {
    let mut vault = store();
    let mut script = sign_up_and_log_in();
    script.extend([
        Pick(1),
        Text("example.com"),
        Text("alice"),
        Pick(0),
        Secret("s3cr3t!"),
        Yes,
        // account -> change username
        Pick(3),
        Pick(0),
        Text("alice2"),
        Yes,
        // back from account screen
        Pick(3),
    ]);
    script.extend(quit_from_menu());
    run_script(&mut vault, script).unwrap();

    assert!(!vault.owner_exists("alice").unwrap());
    let owner = vault.authenticate("alice2", "Passw0rd!").unwrap();
    let record = vault.find_record_by_site(&owner, "example.com").unwrap();
    assert_eq!(record.owner_identity, "alice2");
}

#[test]
fn delete_account_returns_to_start() {
    let mut vault = store();
    let mut script = sign_up_and_log_in();
    script.extend([
        Pick(1),
        Text("example.com"),
        Text("alice"),
        Pick(0),
        Secret("s3cr3t!"),
        Yes,
        Pick(3),
        Pick(2),
        Text("alice"),
        Yes,
        // start screen: quit
        Pick(3),
        Yes,
    ]);
    run_script(&mut vault, script).unwrap();

    assert!(!vault.owner_exists("alice").unwrap());
}

#[test]
fn unknown_username_is_retried_then_abandoned() {
    let mut vault = store();
    let settings = Settings::default();
    let prompter = ScriptedPrompter::new([Text("ghost"), Text("ghost2"), Text("ghost3")]);
    let mut shell = Shell::new(&mut vault, &settings, None, prompter);

    assert_eq!(shell.step(Screen::Login).unwrap(), Screen::Start);
    assert_eq!(shell.session().state(), &SessionState::Anonymous);
}

#[test]
fn wrong_passwords_end_the_login_after_max_attempts() {
    let mut vault = store();
    vault.create_owner("alice", "Passw0rd!").unwrap();
    let settings = Settings::default();
    let prompter = ScriptedPrompter::new([
        Text("alice"),
        Secret("bad1"),
        No,
        Secret("bad2"),
        No,
        Secret("bad3"),
    ]);
    let mut shell = Shell::new(&mut vault, &settings, None, prompter);

    assert_eq!(shell.step(Screen::Login).unwrap(), Screen::Start);
    assert!(!shell.session().is_authenticated());
}

#[test]
fn forgotten_password_can_be_reset_from_login() {
    let mut vault = store();
    vault.create_owner("alice", "Passw0rd!").unwrap();
    let settings = Settings::default();
    let prompter = ScriptedPrompter::new([
        Text("alice"),
        Secret("forgotten"),
        Yes,
        Secret("N3wPassword"),
        Secret("N3wPassword"),
    ]);
    {
        let mut shell = Shell::new(&mut vault, &settings, None, prompter);
        assert_eq!(shell.step(Screen::Login).unwrap(), Screen::Login);
        assert_eq!(shell.session().state(), &SessionState::Anonymous);
    }

    vault.authenticate("alice", "N3wPassword").unwrap();
}

#[test]
fn weak_sign_up_password_is_retried() {
    let mut vault = store();
    let settings = Settings::default();
    let prompter = ScriptedPrompter::new([
        Text("alice"),
        Secret("weak"),
        Secret("stillweak"),
        Secret("Passw0rd!"),
        Secret("Passw0rd!"),
    ]);
    {
        let mut shell = Shell::new(&mut vault, &settings, None, prompter);
        assert_eq!(shell.step(Screen::SignUp).unwrap(), Screen::Start);
    }
    vault.authenticate("alice", "Passw0rd!").unwrap();
}

#[test]
fn mismatched_sign_up_confirmation_creates_nothing() {
    let mut vault = store();
    let settings = Settings::default();
    let prompter = ScriptedPrompter::new([
        Text("alice"),
        Secret("Passw0rd!"),
        Secret("Passw0rd?"),
    ]);
    {
        let mut shell = Shell::new(&mut vault, &settings, None, prompter);
        assert_eq!(shell.step(Screen::SignUp).unwrap(), Screen::Start);
    }
    assert!(!vault.owner_exists("alice").unwrap());
}

#[test]
fn environment_password_only_answers_the_login_prompt() {
    let mut vault = store();
    vault.create_owner("alice", "Passw0rd!").unwrap();
    let settings = Settings::default();
    let script = vec![
        // log in: the password comes from the environment
        Pick(1),
        Text("alice"),
        // account -> change password: every field is typed
        Pick(3),
        Pick(1),
        Secret("Passw0rd!"),
        Secret("N3wPassword!"),
        Secret("N3wPassword!"),
        Pick(3),
        Pick(6),
        Yes,
    ];
    let prompter = ScriptedPrompter::new(script).with_login_secret("Passw0rd!");
    Shell::new(&mut vault, &settings, None, prompter)
        .run()
        .unwrap();

    vault.authenticate("alice", "N3wPassword!").unwrap();
    assert!(matches!(
        vault.authenticate("alice", "Passw0rd!"),
        Err(VaultError::BadSecret)
    ));
}

#[test]
fn environment_password_is_not_used_for_sign_up() {
    let mut vault = store();
    let settings = Settings::default();
    let prompter = ScriptedPrompter::new([
        Text("alice"),
        Secret("Typed0Password"),
        Secret("Typed0Password"),
    ])
    .with_login_secret("Passw0rd!");
    {
        let mut shell = Shell::new(&mut vault, &settings, None, prompter);
        assert_eq!(shell.step(Screen::SignUp).unwrap(), Screen::Start);
    }

    vault.authenticate("alice", "Typed0Password").unwrap();
}

#[test]
fn menu_screens_need_a_signed_in_owner() {
    let mut vault = store();
    let settings = Settings::default();
    let prompter = ScriptedPrompter::new([]);
    let mut shell = Shell::new(&mut vault, &settings, None, prompter);

    assert_eq!(shell.step(Screen::Menu).unwrap(), Screen::Start);
    assert_eq!(shell.step(Screen::ViewRecords).unwrap(), Screen::Start);
}

#[test]
fn exhausted_input_is_an_error() {
    let mut vault = store();
    let err = run_script(&mut vault, Vec::new()).unwrap_err();
    assert!(matches!(err, VaultError::CommandFailed(_)));
}

#[test]
fn audit_log_records_shell_operations() {
    let dir = tempfile::TempDir::new().unwrap();
    let audit = encrypto::audit::AuditLog::open(dir.path()).unwrap();
    let mut vault = store();
    let settings = Settings::default();

    let mut script = sign_up_and_log_in();
    script.extend([
        Pick(1),
        Text("example.com"),
        Text("alice"),
        Pick(0),
        Secret("s3cr3t!"),
        Yes,
    ]);
    script.extend(quit_from_menu());
    Shell::new(&mut vault, &settings, Some(&audit), ScriptedPrompter::new(script))
        .run()
        .unwrap();

    let ops: Vec<_> = audit
        .query(10, None)
        .unwrap()
        .into_iter()
        .rev()
        .map(|e| e.operation)
        .collect();
    assert_eq!(ops, ["signup", "login", "create-record"]);

    let entries = audit.query(10, None).unwrap();
    assert!(entries
        .iter()
        .all(|e| e.details.as_deref().map_or(true, |d| !d.contains("s3cr3t!"))));
}
