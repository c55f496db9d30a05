use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (relative, content) in files {
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn validate_cmd(root: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("route-audit");
    cmd.arg("validate").arg(root).arg("--ci");
    cmd
}

fn json_report(root: &Path, extra: &[&str]) -> Value {
    let output = validate_cmd(root)
        .args(["--format", "json"])
        .args(extra)
        .output()
        .unwrap();
    serde_json::from_slice(&output.stdout).unwrap()
}

fn issues_of_kind<'a>(report: &'a Value, kind: &str) -> Vec<&'a Value> {
    report["issues"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|issue| issue["kind"] == kind)
        .collect()
}

fn switch_handler(cases: &[(&str, &str)]) -> String {
    let mut out = String::from("export const handler = async (event) => {\n  switch (event.routeKey) {\n");
    for (route, body) in cases {
        out.push_str(&format!("    case '{route}':\n      {body}\n"));
    }
    out.push_str("  }\n};\n");
    out
}

mod scenarios {
    use super::*;

    #[test]
    fn test_internal_health_route_is_not_orphaned() {
        let handler = switch_handler(&[("GET /health", "return ok();")]);
        let dir = project(&[
            ("handlers/api.ts", &handler),
            (
                "infra/serverless.yml",
                "functions:\n  api:\n    handler: handlers/api.handler\n    events:\n      - httpApi: 'GET /health'\n",
            ),
            (".route-audit.yaml", "registry:\n  internal: ['GET /health']\n"),
        ]);

        let report = json_report(dir.path(), &[]);
        assert!(report["issues"].as_array().unwrap().is_empty(), "{report:#}");
        assert_eq!(report["tier"], "certified");

        validate_cmd(dir.path()).assert().success().code(0);
    }

    #[test]
    fn test_admin_route_without_role_gate() {
        let handler = switch_handler(&[("GET /admin/sys/widgets/{id}", "return getWidget(event);")]);
        let dir = project(&[("handlers/admin.ts", &handler)]);

        let report = json_report(dir.path(), &[]);
        let missing = issues_of_kind(&report, "missing-admin-check");
        assert_eq!(missing.len(), 1, "{report:#}");
        assert_eq!(missing[0]["severity"], "error");
        assert_eq!(missing[0]["file"], "handlers/admin.ts");
        assert_eq!(missing[0]["line"], 3);
        assert_eq!(report["totals"]["errors"], 1);

        let route = &report["routes"][0];
        assert_eq!(route["scope"], "system-admin");
        assert_eq!(route["key"]["path"], "/admin/sys/widgets/{}");

        validate_cmd(dir.path()).assert().failure().code(1);
    }

    #[test]
    fn test_page_delegating_to_passing_component() {
        let handler = switch_handler(&[(
            "GET /admin/org/widgets",
            "requireOrgAdmin(event); return listWidgets(event);",
        )]);
        let dir = project(&[
            (
                "client/src/pages/admin/org/widgets.tsx",
                "import OrgWidgetsAdmin from '../../../components/OrgWidgetsAdmin';\n\nexport default function WidgetsPage() {\n  return <OrgWidgetsAdmin />;\n}\n",
            ),
            (
                "client/src/components/OrgWidgetsAdmin.tsx",
                "/**\n * @route GET /admin/org/widgets [scope=org-admin]\n */\nexport default function OrgWidgetsAdmin() {\n  const widgets = apiRequest('GET', '/admin/org/widgets');\n  return <Table rows={widgets} />;\n}\n",
            ),
            ("handlers/admin.ts", &handler),
        ]);

        let report = json_report(dir.path(), &[]);
        let at_page: Vec<_> = report["issues"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|i| i["file"] == "client/src/pages/admin/org/widgets.tsx")
            .collect();
        assert!(at_page.is_empty(), "{report:#}");
        assert!(report["issues"].as_array().unwrap().is_empty(), "{report:#}");
    }

    #[test]
    fn test_page_delegating_to_failing_component() {
        let handler = switch_handler(&[("GET /admin/org/widgets", "return listWidgets(event);")]);
        let dir = project(&[
            (
                "client/src/pages/admin/org/widgets.tsx",
                "import OrgWidgetsAdmin from '../../../components/OrgWidgetsAdmin';\n\nexport default function WidgetsPage() {\n  return <OrgWidgetsAdmin />;\n}\n",
            ),
            (
                "client/src/components/OrgWidgetsAdmin.tsx",
                "/**\n * @route GET /admin/org/widgets\n */\nexport default function OrgWidgetsAdmin() {\n  return null;\n}\n",
            ),
            ("handlers/admin.ts", &handler),
        ]);

        let report = json_report(dir.path(), &[]);
        let delegated = issues_of_kind(&report, "delegated-component-auth-failure");
        assert_eq!(delegated.len(), 1, "{report:#}");
        assert_eq!(delegated[0]["file"], "client/src/components/OrgWidgetsAdmin.tsx");
        assert_eq!(issues_of_kind(&report, "missing-admin-check").len(), 1);
        assert!(issues_of_kind(&report, "page-missing-role-check").is_empty());
    }

    #[test]
    fn test_param_spellings_merge_into_one_record() {
        let handler = switch_handler(&[(
            "GET /chats/{sessionId}",
            "requireSelf(event); return getChat(event);",
        )]);
        let dir = project(&[
            ("handlers/chats.ts", &handler),
            (
                "client/src/api/chats.ts",
                "export const getChat = (id) => apiRequest('GET', `/chats/${id}`);\n",
            ),
        ]);

        let report = json_report(dir.path(), &[]);
        let routes = report["routes"].as_array().unwrap();
        assert_eq!(routes.len(), 1, "{report:#}");
        assert_eq!(routes[0]["presence"]["client"], true);
        assert_eq!(routes[0]["presence"]["handler"], true);
        assert_eq!(routes[0]["templates"].as_array().unwrap().len(), 2);
        assert!(report["issues"].as_array().unwrap().is_empty(), "{report:#}");
    }

    #[test]
    fn test_excluded_build_output_is_not_counted() {
        let call = "export const ghost = () => apiRequest('GET', '/ghosts');\n";
        let files = [
            ("client/src/api.ts", call),
            ("client/dist/assets/index.js", call),
            ("client/generated/api.js", call),
        ];

        let dir = project(&files);
        fs::write(
            dir.path().join(".route-audit.yaml"),
            "layout:\n  client_roots: [client]\n",
        )
        .unwrap();
        let before = json_report(dir.path(), &[]);
        assert_eq!(issues_of_kind(&before, "route-not-found").len(), 2);
        assert_eq!(before["routes"][0]["call_sites"].as_array().unwrap().len(), 2);

        fs::write(
            dir.path().join(".route-audit.yaml"),
            "layout:\n  client_roots: [client]\nexclude: [generated]\n",
        )
        .unwrap();
        let after = json_report(dir.path(), &[]);
        let not_found = issues_of_kind(&after, "route-not-found");
        assert_eq!(not_found.len(), 1);
        assert_eq!(not_found[0]["file"], "client/src/api.ts");
        assert_eq!(after["routes"][0]["call_sites"].as_array().unwrap().len(), 1);
    }

    fn layer2_only_tree() -> TempDir {
        let routes = ["/notes/{id}", "/files/{id}", "/drafts/{id}", "/tags/{id}", "/pins/{id}"];
        let cases: Vec<(String, &str)> = routes
            .iter()
            .map(|r| (format!("GET {r}"), "return load(event);"))
            .collect();
        let cases: Vec<(&str, &str)> = cases.iter().map(|(r, b)| (r.as_str(), *b)).collect();
        let handler = switch_handler(&cases);
        let client: String = routes
            .iter()
            .map(|r| format!("apiRequest('GET', '{r}');\n"))
            .collect();
        project(&[("handlers/api.ts", &handler), ("client/src/api.ts", &client)])
    }

    #[test]
    fn test_layer1_only_hides_layer2_errors() {
        let dir = layer2_only_tree();

        let report = json_report(dir.path(), &["--layer1-only"]);
        assert_eq!(report["totals"]["errors"], 0, "{report:#}");
        validate_cmd(dir.path())
            .arg("--layer1-only")
            .assert()
            .success()
            .code(0);

        let report = json_report(dir.path(), &["--all-auth"]);
        assert_eq!(report["totals"]["errors"], 5, "{report:#}");
        assert_eq!(issues_of_kind(&report, "missing-self-ownership-check").len(), 5);
        validate_cmd(dir.path())
            .arg("--all-auth")
            .assert()
            .failure()
            .code(1);
    }
}

mod properties {
    use super::*;

    #[test]
    fn test_output_is_deterministic() {
        let handler = switch_handler(&[
            ("GET /admin/sys/widgets/{id}", "return getWidget(event);"),
            ("POST /orgs/{orgId}/files", "requirePermission(event); return upload(event);"),
            ("DELETE /notes/{id}", "return remove(event);"),
        ]);
        let dir = project(&[
            ("handlers/api.ts", &handler),
            ("client/src/a.ts", "apiRequest('GET', '/missing');\nfetch('/direct');\n"),
            ("client/src/b.ts", "apiRequest.delete(`/notes/${id}`);\n"),
        ]);

        let first = validate_cmd(dir.path()).args(["--format", "json"]).output().unwrap();
        let second = validate_cmd(dir.path()).args(["--format", "json"]).output().unwrap();
        assert!(!first.stdout.is_empty());
        assert_eq!(first.stdout, second.stdout);
    }

    #[test]
    fn test_async_handler_is_exempt_from_layer2() {
        let handler = format!(
            "import type {{ SQSEvent }} from 'aws-lambda';\n{}",
            switch_handler(&[("GET /notes/{id}", "return load(event);")])
        );
        let dir = project(&[("handlers/worker.ts", &handler)]);

        let report = json_report(dir.path(), &[]);
        assert!(issues_of_kind(&report, "missing-self-ownership-check").is_empty());
        assert!(issues_of_kind(&report, "orphaned-route").is_empty());
        assert_eq!(report["totals"]["errors"], 0, "{report:#}");
    }

    #[test]
    fn test_queue_function_in_another_service_does_not_exempt() {
        let admin = switch_handler(&[("GET /admin/sys/widgets/{id}", "return getWidget(event);")]);
        let dir = project(&[
            (
                "services/a/serverless.yml",
                "functions:\n  worker:\n    handler: handlers/index.handler\n    events:\n      - sqs:\n          arn: arn:aws:sqs:region:acct:jobs\n",
            ),
            ("services/a/handlers/index.ts", "export const handler = async (event) => drain(event.Records);\n"),
            ("services/b/handlers/index.ts", &admin),
        ]);

        let report = json_report(dir.path(), &[]);
        let missing = issues_of_kind(&report, "missing-admin-check");
        assert_eq!(missing.len(), 1, "{report:#}");
        assert_eq!(missing[0]["file"], "services/b/handlers/index.ts");
    }

    #[test]
    fn test_function_serving_http_and_queue_is_checked() {
        let admin = switch_handler(&[("GET /admin/sys/widgets/{id}", "return getWidget(event);")]);
        let dir = project(&[
            (
                "serverless.yml",
                "functions:\n  mixed:\n    handler: handlers/admin.handler\n    events:\n      - httpApi: 'GET /admin/sys/widgets/{id}'\n      - sqs:\n          arn: arn:aws:sqs:region:acct:jobs\n",
            ),
            ("handlers/admin.ts", &admin),
        ]);

        let report = json_report(dir.path(), &[]);
        assert_eq!(issues_of_kind(&report, "missing-admin-check").len(), 1, "{report:#}");
        validate_cmd(dir.path()).assert().failure().code(1);
    }

    #[test]
    fn test_comment_mentioning_queue_event_does_not_exempt() {
        let admin = format!(
            "// TODO: split the SQSEvent worker out of this file\n{}",
            switch_handler(&[("GET /admin/sys/widgets/{id}", "return getWidget(event);")])
        );
        let dir = project(&[("handlers/admin.ts", &admin)]);

        let report = json_report(dir.path(), &[]);
        assert_eq!(issues_of_kind(&report, "missing-admin-check").len(), 1, "{report:#}");
    }

    #[test]
    fn test_admin_override_does_not_satisfy_ownership() {
        let handler = switch_handler(&[(
            "GET /notes/{id}",
            "if (isSystemAdmin(event)) { return loadAny(event); } return load(event);",
        )]);
        let dir = project(&[
            ("handlers/api.ts", &handler),
            ("client/src/api.ts", "apiRequest('GET', `/notes/${id}`);\n"),
        ]);

        let report = json_report(dir.path(), &[]);
        assert_eq!(issues_of_kind(&report, "missing-self-ownership-check").len(), 1);
        let overrides = issues_of_kind(&report, "admin-override");
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0]["severity"], "warning");
    }

    #[test]
    fn test_tests_and_dependencies_are_skipped() {
        let call = "apiRequest('GET', '/ghosts');\n";
        let dir = project(&[
            ("client/src/node_modules/lib/index.js", call),
            ("client/src/__tests__/api.test.ts", call),
            ("client/src/api.spec.ts", call),
        ]);

        let report = json_report(dir.path(), &[]);
        assert!(report["routes"].as_array().unwrap().is_empty(), "{report:#}");
        assert_eq!(report["files_scanned"], 0);
    }

    #[test]
    fn test_include_tests_scans_test_sources() {
        let dir = project(&[
            ("client/src/__tests__/api.test.ts", "apiRequest('GET', '/ghosts');\n"),
            (".route-audit.yaml", "include_tests: true\n"),
        ]);

        let report = json_report(dir.path(), &[]);
        assert_eq!(report["files_scanned"], 1, "{report:#}");
        assert_eq!(issues_of_kind(&report, "route-not-found").len(), 1);
    }
}

mod cli {
    use super::*;

    #[test]
    fn test_help() {
        cargo_bin_cmd!("route-audit")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("validate"));
    }

    #[test]
    fn test_clean_project_text_output() {
        let dir = project(&[]);
        validate_cmd(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("CERTIFIED"))
            .stdout(predicate::str::contains("PASS"));
    }

    #[test]
    fn test_missing_root_exits_2() {
        cargo_bin_cmd!("route-audit")
            .args(["validate", "/definitely/not/a/project"])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("Project root not found"));
    }

    #[test]
    fn test_unknown_module_exits_2() {
        let dir = project(&[]);
        validate_cmd(dir.path())
            .args(["--module", "billing"])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("Unknown module: billing"));
    }

    #[test]
    fn test_broken_config_exits_2() {
        let dir = project(&[(".route-audit.yaml", "registry: [unterminated\n")]);
        validate_cmd(dir.path()).assert().failure().code(2);
    }

    #[test]
    fn test_invalid_regex_exits_2() {
        let dir = project(&[(
            ".route-audit.yaml",
            "client:\n  direct_call_whitelist: ['(unclosed']\n",
        )]);
        validate_cmd(dir.path())
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("direct_call_whitelist"));
    }

    #[test]
    fn test_explicit_config_flag() {
        let dir = project(&[(
            "audit.toml",
            "[[registry.modules]]\nname = \"widgets\"\nprefixes = [\"/widgets\"]\n",
        )]);
        let config = dir.path().join("audit.toml");
        validate_cmd(dir.path())
            .arg("--config")
            .arg(&config)
            .args(["--module", "widgets"])
            .assert()
            .success();
    }

    #[test]
    fn test_verbose_lists_issue_locations() {
        let handler = switch_handler(&[("GET /admin/sys/widgets/{id}", "return getWidget(event);")]);
        let dir = project(&[("handlers/admin.ts", &handler)]);
        validate_cmd(dir.path())
            .arg("--verbose")
            .assert()
            .failure()
            .stdout(predicate::str::contains("handlers/admin.ts:3"))
            .stdout(predicate::str::contains("missing-admin-check"));
    }

    #[test]
    fn test_layer_flags_conflict() {
        let dir = project(&[]);
        validate_cmd(dir.path())
            .args(["--layer1-only", "--layer2-only"])
            .assert()
            .failure()
            .code(2);
    }
}
