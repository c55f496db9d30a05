use crate::extract::{PathExpr, ScannedFile};
use crate::rules::engine::{Rule, RuleContext};
use crate::rules::types::{Issue, IssueKind};

pub struct DirectNetworkCallRule;

impl Rule for DirectNetworkCallRule {
    fn id(&self) -> &'static str {
        "direct-network-call"
    }

    fn check_file(&self, file: &ScannedFile, ctx: &RuleContext<'_>) -> Vec<Issue> {
        file.direct_calls
            .iter()
            .filter(|call| !call.whitelisted)
            .map(|call| {
                Issue::new(
                    IssueKind::DirectNetworkCall,
                    &call.file,
                    call.line,
                    format!(
                        "Direct network call `{}` bypasses {}",
                        call.callee, ctx.config.client.wrapper
                    ),
                )
            })
            .collect()
    }
}

pub struct UnparseableCallRule;

impl Rule for UnparseableCallRule {
    fn id(&self) -> &'static str {
        "unparseable-call"
    }

    fn check_file(&self, file: &ScannedFile, _ctx: &RuleContext<'_>) -> Vec<Issue> {
        file.call_sites
            .iter()
            .filter_map(|site| match &site.path {
                PathExpr::Unresolved(reason) => Some(Issue::new(
                    IssueKind::UnparseableCall,
                    &site.file,
                    site.line,
                    format!("Cannot resolve {} request path: {reason}", site.verb),
                )),
                PathExpr::Resolved(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::extract::{ExtractedCallSite, ExtractedDirectCall, Tier};
    use crate::routes::HttpVerb;
    use crate::rules::builtin::fixtures::run_rule;

    #[test]
    fn test_whitelisted_direct_calls_skipped() {
        let mut file = ScannedFile::new("client/src/upload.ts", Tier::Client);
        for (line, whitelisted) in [(3, false), (7, true)] {
            file.direct_calls.push(ExtractedDirectCall {
                callee: "fetch".to_string(),
                file: file.file.clone(),
                line,
                whitelisted,
            });
        }
        let issues = run_rule(&DirectNetworkCallRule, &Config::default(), &[file]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 3);
        assert!(issues[0].message.contains("apiRequest"));
    }

    #[test]
    fn test_unresolved_paths_warn() {
        let mut file = ScannedFile::new("client/src/api.ts", Tier::Client);
        file.call_sites.push(ExtractedCallSite {
            verb: HttpVerb::Get,
            path: PathExpr::Unresolved("identifier `url`".to_string()),
            file: file.file.clone(),
            line: 4,
        });
        let issues = run_rule(&UnparseableCallRule, &Config::default(), &[file]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::UnparseableCall);
        assert!(issues[0].message.contains("url"));
    }
}
