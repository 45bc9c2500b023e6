//! Behavioural tests for first-run administrator provisioning.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::admin::{
    AdminProvisioner, CREDENTIAL_FILE, FileIdentityStore, IdentityProvider, PASSWORD_LENGTH,
    ProvisionOutcome,
};

use super::support::{CountingIdentityProvider, TestConfigLoader};

const SEEDED_CREDENTIALS: &str = "username: admin\npassword: seeded";

struct ProvisioningWorld {
    loader: TestConfigLoader,
    identity: CountingIdentityProvider,
    outcomes: Vec<ProvisionOutcome>,
}

impl ProvisioningWorld {
    fn new() -> Self {
        Self {
            loader: TestConfigLoader::new(),
            identity: CountingIdentityProvider::default(),
            outcomes: Vec::new(),
        }
    }

    fn credential_path(&self) -> PathBuf {
        self.loader.path().join(CREDENTIAL_FILE)
    }

    fn provision(&mut self) {
        let store = self
            .identity
            .open(self.loader.config())
            .expect("open identity store");
        let outcome = AdminProvisioner::new(store, self.loader.path())
            .provision()
            .expect("provisioning succeeds");
        self.outcomes.push(outcome);
    }

    fn recorded_password(&self) -> String {
        let contents = fs::read_to_string(self.credential_path()).expect("read credential file");
        contents
            .lines()
            .find_map(|line| line.strip_prefix("password: "))
            .expect("password line")
            .to_owned()
    }
}

#[fixture]
fn world() -> RefCell<ProvisioningWorld> {
    RefCell::new(ProvisioningWorld::new())
}

#[given("a fresh working directory")]
fn given_fresh_directory(world: &RefCell<ProvisioningWorld>) {
    assert!(!world.borrow().credential_path().exists());
}

#[given("a credential file already exists")]
fn given_existing_file(world: &RefCell<ProvisioningWorld>) {
    fs::write(world.borrow().credential_path(), SEEDED_CREDENTIALS).expect("seed file");
}

#[when("the administrator is provisioned")]
fn when_provisioned(world: &RefCell<ProvisioningWorld>) {
    world.borrow_mut().provision();
}

#[then("the credential file names the admin user")]
fn then_file_names_admin(world: &RefCell<ProvisioningWorld>) {
    let contents =
        fs::read_to_string(world.borrow().credential_path()).expect("read credential file");
    assert!(contents.starts_with("username: admin\n"), "{contents}");
}

#[then("the credential file holds an {length} character alphanumeric password")]
fn then_password_shape(world: &RefCell<ProvisioningWorld>, length: usize) {
    let password = world.borrow().recorded_password();
    assert_eq!(length, PASSWORD_LENGTH);
    assert_eq!(password.len(), length);
    assert!(password.chars().all(|ch| ch.is_ascii_alphanumeric()));
}

#[then("the identity store accepts the recorded password")]
fn then_store_accepts(world: &RefCell<ProvisioningWorld>) {
    let world = world.borrow();
    let data_dir = world
        .loader
        .config()
        .data_directory()
        .expect("data directory");
    let store = FileIdentityStore::open(data_dir).expect("open store");
    assert!(
        store
            .verify_password(&world.recorded_password())
            .expect("verify password")
    );
}

#[then("provisioning reports the existing file")]
fn then_reports_existing(world: &RefCell<ProvisioningWorld>) {
    let world = world.borrow();
    assert_eq!(
        world.outcomes.last(),
        Some(&ProvisionOutcome::AlreadyProvisioned {
            file: world.credential_path(),
        })
    );
    assert_eq!(
        fs::read_to_string(world.credential_path()).expect("read file"),
        SEEDED_CREDENTIALS
    );
}

#[then("no password update was made")]
fn then_no_update(world: &RefCell<ProvisioningWorld>) {
    assert_eq!(world.borrow().identity.password_updates(), 0);
}

#[then("exactly {count} password update was made")]
fn then_update_count(world: &RefCell<ProvisioningWorld>, count: usize) {
    assert_eq!(world.borrow().identity.password_updates(), count);
}

#[scenario(path = "tests/features/admin_provisioning.feature")]
fn admin_provisioning(#[from(world)] world: RefCell<ProvisioningWorld>) {
    drop(world);
}
