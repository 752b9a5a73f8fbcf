use assert_cmd::Command;

// `--test` renders the cluster config and exits without touching AWS or
// eksctl, so these run anywhere.

#[test]
fn dry_run_prints_dedicated_vpc_config() {
    let assert = Command::cargo_bin("memberctl")
        .unwrap()
        .args(["--name", "client-a", "--region", "us-east-1", "--test"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("eksctl.io/v1alpha5"));
    assert!(stdout.contains("client-a"));
    assert!(stdout.contains("us-east-1"));
    // No --cidr given; the default block is used.
    assert!(stdout.contains("192.168.0.0/16"));
    assert!(stdout.contains("Single"));
    assert!(stdout.contains("member-ng"));
    // No ssh key was supplied, so the config must not mention one.
    assert!(!stdout.contains("publicKeyPath"));
}

#[test]
fn dry_run_includes_supplied_ssh_key() {
    let assert = Command::cargo_bin("memberctl")
        .unwrap()
        .args([
            "--name",
            "client-b",
            "--region",
            "us-west-2",
            "--cidr",
            "10.10.0.0/16",
            "--public-key-path",
            "/home/user/.ssh/id_rsa.pub",
            "--test",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("10.10.0.0/16"));
    assert!(stdout.contains("publicKeyPath"));
    assert!(stdout.contains("/home/user/.ssh/id_rsa.pub"));
}

#[test]
fn name_is_required() {
    Command::cargo_bin("memberctl")
        .unwrap()
        .args(["--region", "us-east-1", "--test"])
        .assert()
        .failure();
}
