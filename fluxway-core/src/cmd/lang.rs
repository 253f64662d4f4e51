use crate::cmd::{resolve, split_command_line, Action};
use crate::state::view::ViewId;

/// Hard recursion cap; pathological configs evaluate to false instead of
/// blowing the stack.
pub const CMDLANG_MAX_DEPTH: u32 = 8;

/// Everything the evaluator needs from its embedding. The server is the one
/// real implementation; tests use small fakes.
pub trait CmdLangHost {
    /// Run one resolved action. Returns whether a mutation occurred.
    fn exec(
        &mut self,
        action: Action,
        arg: i32,
        cmd: Option<&str>,
        target: Option<ViewId>,
        depth: u32,
    ) -> bool;
    /// Client-pattern match against a view (or the focused view).
    fn matches(&mut self, pattern: &str, target: Option<ViewId>) -> bool;
    /// The core list in map order.
    fn view_ids(&self) -> Vec<ViewId>;
    fn view_create_seq(&self, id: ViewId) -> u64;
    fn view_in_tab_group(&self, id: ViewId) -> bool;
    fn tabs_view_is_active(&self, id: ViewId) -> bool;
    /// Rotation index for `togglecmd`, keyed by (scope, textual args).
    fn toggle_index(&mut self, scope: u64, key: &str, len: usize) -> usize;
    /// Arm (or re-arm) the one-shot `delay` timer for (scope, key).
    fn delay_schedule(&mut self, scope: u64, key: &str, cmd_line: &str, usec: u64) -> bool;
    /// Scope handle of the binding driving the current dispatch.
    fn cmdlang_scope(&self) -> u64;
}

/// Extract one `{...}` token. Returns the token (escapes preserved) and the
/// number of bytes consumed including the closing delimiter.
#[must_use]
pub fn get_string_between(
    instr: &str,
    first: char,
    last: char,
    allow_nesting: bool,
) -> Option<(String, usize)> {
    let bytes = instr.as_bytes();
    let mut p = 0;
    while p < bytes.len() && (bytes[p] == b' ' || bytes[p] == b'\t' || bytes[p] == b'\n') {
        p += 1;
    }
    if p >= bytes.len() || bytes[p] != first as u8 {
        return None;
    }
    let open = p;
    let mut nesting = 0;
    let mut q = open + 1;
    while q < bytes.len() {
        let escaped = bytes[q - 1] == b'\\';
        if allow_nesting && bytes[q] == first as u8 && !escaped {
            nesting += 1;
            q += 1;
            continue;
        }
        if bytes[q] == last as u8 && !escaped {
            if allow_nesting && nesting > 0 {
                nesting -= 1;
                q += 1;
                continue;
            }
            let token = instr[open + 1..q].to_string();
            return Some((token, q + 1));
        }
        q += 1;
    }
    None
}

/// All leading `{...}` tokens plus the unconsumed rest of the input.
#[must_use]
pub fn tokens_between(input: &str) -> (Vec<String>, &str) {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some((token, consumed)) = get_string_between(&input[pos..], '{', '}', true) {
        out.push(token);
        pos += consumed;
    }
    (out, &input[pos..])
}

fn rest_empty(s: &str) -> bool {
    s.trim().is_empty()
}

fn eval_some(host: &mut dyn CmdLangHost, cond: &str, depth: u32) -> bool {
    if depth > CMDLANG_MAX_DEPTH {
        return false;
    }
    for id in host.view_ids() {
        if eval_bool(host, cond, Some(id), depth + 1) {
            return true;
        }
    }
    false
}

fn eval_every(host: &mut dyn CmdLangHost, cond: &str, depth: u32) -> bool {
    if depth > CMDLANG_MAX_DEPTH {
        return false;
    }
    for id in host.view_ids() {
        if !eval_bool(host, cond, Some(id), depth + 1) {
            return false;
        }
    }
    true
}

fn eval_list(
    host: &mut dyn CmdLangHost,
    args: &str,
    target: Option<ViewId>,
    depth: u32,
    op: BoolOp,
) -> bool {
    if depth > CMDLANG_MAX_DEPTH {
        return false;
    }
    let (tokens, rest) = tokens_between(args);
    if tokens.is_empty() || !rest_empty(rest) {
        return false;
    }
    match op {
        BoolOp::And => {
            for token in &tokens {
                let token = token.trim();
                if token.is_empty() || !eval_bool(host, token, target, depth + 1) {
                    return false;
                }
            }
            true
        }
        BoolOp::Or => {
            for token in &tokens {
                let token = token.trim();
                if !token.is_empty() && eval_bool(host, token, target, depth + 1) {
                    return true;
                }
            }
            false
        }
        BoolOp::Xor => {
            let mut acc = false;
            for token in &tokens {
                let token = token.trim();
                if !token.is_empty() && eval_bool(host, token, target, depth + 1) {
                    acc = !acc;
                }
            }
            acc
        }
    }
}

enum BoolOp {
    And,
    Or,
    Xor,
}

/// Boolean expression over the view population.
pub fn eval_bool(
    host: &mut dyn CmdLangHost,
    expr: &str,
    target: Option<ViewId>,
    depth: u32,
) -> bool {
    if depth > CMDLANG_MAX_DEPTH {
        return false;
    }
    let Some((head, args)) = split_command_line(expr) else {
        return false;
    };
    match head.to_ascii_lowercase().as_str() {
        "matches" => host.matches(args, target),
        "some" => eval_some(host, args, depth),
        "every" => eval_every(host, args, depth),
        "not" => !eval_bool(host, args, target, depth + 1),
        "and" => eval_list(host, args, target, depth, BoolOp::And),
        "or" => eval_list(host, args, target, depth, BoolOp::Or),
        "xor" => eval_list(host, args, target, depth, BoolOp::Xor),
        _ => false,
    }
}

/// Resolve and run one command line against the host.
pub fn execute_line(
    host: &mut dyn CmdLangHost,
    line: &str,
    target: Option<ViewId>,
    depth: u32,
) -> bool {
    if depth > CMDLANG_MAX_DEPTH {
        return false;
    }
    let Some((name, args)) = split_command_line(line) else {
        return false;
    };
    let Some(resolved) = resolve(name, args) else {
        fluxway_utils::debug!("{}: invalid args", name);
        return false;
    };
    host.exec(
        resolved.action,
        resolved.arg,
        resolved.cmd.as_deref(),
        target,
        depth,
    )
}

/// `macrocmd { a } { b } ...` runs each line; true if any succeeded.
pub fn execute_macro(
    host: &mut dyn CmdLangHost,
    args: &str,
    target: Option<ViewId>,
    depth: u32,
) -> bool {
    if depth > CMDLANG_MAX_DEPTH {
        return false;
    }
    let (tokens, rest) = tokens_between(args);
    if tokens.is_empty() || !rest_empty(rest) {
        return false;
    }
    let mut any = false;
    for token in &tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if execute_line(host, token, target, depth + 1) {
            any = true;
        }
    }
    any
}

/// `if { cond } { then } [{ else }]`.
pub fn execute_if(
    host: &mut dyn CmdLangHost,
    args: &str,
    target: Option<ViewId>,
    depth: u32,
) -> bool {
    if depth > CMDLANG_MAX_DEPTH {
        return false;
    }
    let (tokens, rest) = tokens_between(args);
    if tokens.len() < 2 || tokens.len() > 3 || !rest_empty(rest) {
        return false;
    }
    let cond = tokens[0].trim();
    let branch = if eval_bool(host, cond, target, depth + 1) {
        tokens[1].trim()
    } else if tokens.len() > 2 {
        tokens[2].trim()
    } else {
        ""
    };
    if branch.is_empty() {
        return false;
    }
    execute_line(host, branch, target, depth + 1)
}

fn parse_iter_options(s: &str) -> (bool, bool, &str) {
    let trimmed = s.trim();
    if !trimmed.starts_with('{') {
        return (false, false, trimmed);
    }
    let Some((opts, consumed)) = get_string_between(trimmed, '{', '}', true) else {
        return (false, false, trimmed);
    };
    let mut groups = false;
    let mut static_order = false;
    for tok in opts.split_whitespace() {
        if tok.eq_ignore_ascii_case("groups") {
            groups = true;
        } else if tok.eq_ignore_ascii_case("static") {
            static_order = true;
        }
    }
    (groups, static_order, trimmed[consumed..].trim())
}

/// `foreach { cmd } [{ [options] cond }]` runs the command once per matching
/// view with that view as the implicit target.
pub fn execute_foreach(host: &mut dyn CmdLangHost, args: &str, depth: u32) -> bool {
    if depth > CMDLANG_MAX_DEPTH {
        return false;
    }
    let (tokens, rest) = tokens_between(args);
    if tokens.is_empty() || tokens.len() > 2 || !rest_empty(rest) {
        return false;
    }
    let cmd_line = tokens[0].trim().to_string();
    if cmd_line.is_empty() {
        return false;
    }
    let mut groups = false;
    let mut static_order = false;
    let mut cond: Option<String> = None;
    if tokens.len() > 1 {
        let (g, s, c) = parse_iter_options(&tokens[1]);
        groups = g;
        static_order = s;
        if !c.is_empty() {
            cond = Some(c.to_string());
        }
    }

    let mut ids: Vec<ViewId> = host
        .view_ids()
        .into_iter()
        .filter(|id| !groups || !host.view_in_tab_group(*id) || host.tabs_view_is_active(*id))
        .collect();
    if static_order && ids.len() > 1 {
        ids.sort_by_key(|id| host.view_create_seq(*id));
    }

    let mut any = false;
    for id in ids {
        if let Some(cond) = &cond {
            if !eval_bool(host, cond, Some(id), depth + 1) {
                continue;
            }
        }
        if execute_line(host, &cmd_line, Some(id), depth + 1) {
            any = true;
        }
    }
    any
}

/// `togglecmd { a } { b } ...` rotates through its command lines, one step
/// per invocation, keyed per binding scope and textual argument.
pub fn execute_togglecmd(
    host: &mut dyn CmdLangHost,
    args: &str,
    target: Option<ViewId>,
    depth: u32,
) -> bool {
    if depth > CMDLANG_MAX_DEPTH {
        return false;
    }
    let key = args.trim();
    if key.is_empty() {
        return false;
    }
    let (tokens, rest) = tokens_between(args);
    if tokens.is_empty() || !rest_empty(rest) {
        return false;
    }
    let scope = host.cmdlang_scope();
    let pick = host.toggle_index(scope, key, tokens.len());
    let line = tokens[pick % tokens.len()].trim();
    if line.is_empty() {
        return false;
    }
    execute_line(host, line, target, depth + 1)
}

/// `delay { cmd } [usec]` arms a one-shot timer; the default is 200 usec and
/// the millisecond conversion clamps to at least 1.
pub fn execute_delay(host: &mut dyn CmdLangHost, args: &str, depth: u32) -> bool {
    if depth > CMDLANG_MAX_DEPTH {
        return false;
    }
    let Some((cmd, consumed)) = get_string_between(args, '{', '}', true) else {
        return false;
    };
    let cmd = cmd.trim();
    if cmd.is_empty() {
        return false;
    }
    let rest = args[consumed..].trim();
    let usec: u64 = if rest.is_empty() {
        200
    } else {
        rest.parse().unwrap_or(200)
    };
    let scope = host.cmdlang_scope();
    host.delay_schedule(scope, args.trim(), cmd, usec)
}

/// Millisecond deadline for a `delay` microsecond argument.
#[must_use]
pub fn delay_msec(usec: u64) -> u64 {
    let msec = usec.div_ceil(1000);
    msec.max(1)
}

/// State behind `CmdLangHost::toggle_index`, owned by the server and flushed
/// on teardown.
#[derive(Debug, Default)]
pub struct ToggleStates {
    entries: Vec<ToggleState>,
}

#[derive(Debug)]
struct ToggleState {
    scope: u64,
    key: String,
    idx: usize,
}

impl ToggleStates {
    /// Current rotation index for (scope, key); advances for next time.
    pub fn next_index(&mut self, scope: u64, key: &str, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.scope == scope && e.key == key)
        {
            let pick = entry.idx % len;
            entry.idx = (entry.idx + 1) % len;
            return pick;
        }
        self.entries.push(ToggleState {
            scope,
            key: key.to_string(),
            idx: 1 % len,
        });
        0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{
        delay_msec, eval_bool, execute_foreach, execute_if, execute_macro, execute_togglecmd,
        get_string_between, tokens_between, CmdLangHost, ToggleStates, CMDLANG_MAX_DEPTH,
    };
    use crate::cmd::Action;
    use crate::state::view::ViewId;

    /// Fake host: views match by title containment, execs are recorded.
    struct Host {
        views: Vec<(ViewId, String)>,
        execs: Vec<(Action, Option<ViewId>)>,
        toggles: ToggleStates,
        delays: Vec<(u64, String, String, u64)>,
        scope: u64,
    }

    impl Host {
        fn new(titles: &[&str]) -> Self {
            Host {
                views: titles
                    .iter()
                    .enumerate()
                    .map(|(i, t)| (ViewId(i as u64 + 1), (*t).to_string()))
                    .collect(),
                execs: Vec::new(),
                toggles: ToggleStates::default(),
                delays: Vec::new(),
                scope: 7,
            }
        }
    }

    impl CmdLangHost for Host {
        fn exec(
            &mut self,
            action: Action,
            _arg: i32,
            cmd: Option<&str>,
            target: Option<ViewId>,
            depth: u32,
        ) -> bool {
            match action {
                Action::If => {
                    let cmd = cmd.unwrap_or("").to_string();
                    execute_if(self, &cmd, target, depth)
                }
                Action::Macro => {
                    let cmd = cmd.unwrap_or("").to_string();
                    execute_macro(self, &cmd, target, depth)
                }
                _ => {
                    self.execs.push((action, target));
                    true
                }
            }
        }

        fn matches(&mut self, pattern: &str, target: Option<ViewId>) -> bool {
            let Some(target) = target.or_else(|| self.views.first().map(|(id, _)| *id)) else {
                return false;
            };
            self.views
                .iter()
                .any(|(id, title)| *id == target && pattern.contains(title.as_str()))
        }

        fn view_ids(&self) -> Vec<ViewId> {
            self.views.iter().map(|(id, _)| *id).collect()
        }

        fn view_create_seq(&self, id: ViewId) -> u64 {
            id.0
        }

        fn view_in_tab_group(&self, _id: ViewId) -> bool {
            false
        }

        fn tabs_view_is_active(&self, _id: ViewId) -> bool {
            true
        }

        fn toggle_index(&mut self, scope: u64, key: &str, len: usize) -> usize {
            self.toggles.next_index(scope, key, len)
        }

        fn delay_schedule(&mut self, scope: u64, key: &str, cmd_line: &str, usec: u64) -> bool {
            self.delays
                .push((scope, key.to_string(), cmd_line.to_string(), usec));
            true
        }

        fn cmdlang_scope(&self) -> u64 {
            self.scope
        }
    }

    #[test]
    fn tokenizer_handles_nesting_and_escapes() {
        let (tok, consumed) = get_string_between("  {a {b} c} rest", '{', '}', true).unwrap();
        assert_eq!("a {b} c", tok);
        assert_eq!(" rest", &"  {a {b} c} rest"[consumed..]);
        // Escaped braces do not open or close
        let (tok, _) = get_string_between(r"{a \{ b}", '{', '}', true).unwrap();
        assert_eq!(r"a \{ b", tok);
        assert!(get_string_between("{unterminated", '{', '}', true).is_none());
        assert!(get_string_between("no brace", '{', '}', true).is_none());

        let (tokens, rest) = tokens_between("{a} {b} tail");
        assert_eq!(vec!["a".to_string(), "b".to_string()], tokens);
        assert_eq!(" tail", rest);
    }

    #[test]
    fn bool_combinators() {
        let mut host = Host::new(&["term", "browser"]);
        assert!(eval_bool(&mut host, "matches term", None, 0));
        assert!(!eval_bool(&mut host, "matches nothing", None, 0));
        assert!(eval_bool(&mut host, "not matches nothing", None, 0));
        assert!(eval_bool(&mut host, "some matches browser", None, 0));
        assert!(!eval_bool(&mut host, "every matches term", None, 0));
        assert!(eval_bool(
            &mut host,
            "and {matches term} {not matches nothing}",
            None,
            0
        ));
        assert!(eval_bool(
            &mut host,
            "or {matches nothing} {matches term}",
            None,
            0
        ));
        assert!(!eval_bool(
            &mut host,
            "xor {matches term} {matches term}",
            None,
            0
        ));
        assert!(eval_bool(&mut host, "xor {matches term} {matches no}", None, 0));
        // Unknown head and trailing garbage are false
        assert!(!eval_bool(&mut host, "perhaps matches term", None, 0));
        assert!(!eval_bool(&mut host, "and {matches term} junk", None, 0));
    }

    #[test]
    fn depth_cap_holds() {
        let mut host = Host::new(&["term"]);
        let mut expr = "matches term".to_string();
        for _ in 0..=CMDLANG_MAX_DEPTH {
            expr = format!("not {expr}");
        }
        // An over-deep expression evaluates to false regardless of parity
        assert!(!eval_bool(&mut host, &expr, None, 0));
    }

    #[test]
    fn if_picks_branch_by_condition() {
        let mut host = Host::new(&["term"]);
        assert!(execute_if(
            &mut host,
            "{matches term} {Close} {Kill}",
            None,
            0
        ));
        assert_eq!(vec![(Action::Close, None)], host.execs);
        host.execs.clear();
        assert!(execute_if(
            &mut host,
            "{matches nothing} {Close} {Kill}",
            None,
            0
        ));
        assert_eq!(vec![(Action::Kill, None)], host.execs);
        // No else branch and a false condition: nothing ran
        host.execs.clear();
        assert!(!execute_if(&mut host, "{matches nothing} {Close}", None, 0));
        assert!(host.execs.is_empty());
        // Wrong arity fails
        assert!(!execute_if(&mut host, "{matches term}", None, 0));
    }

    #[test]
    fn foreach_targets_each_matching_view() {
        let mut host = Host::new(&["term", "browser", "term2"]);
        assert!(execute_foreach(
            &mut host,
            "{Close} {matches term}",
            0
        ));
        let targets: Vec<_> = host.execs.iter().map(|(_, t)| t.unwrap()).collect();
        assert_eq!(vec![ViewId(1), ViewId(3)], targets);
        // Without a condition every view is hit
        host.execs.clear();
        assert!(execute_foreach(&mut host, "{Lower}", 0));
        assert_eq!(3, host.execs.len());
    }

    #[test]
    fn togglecmd_rotates_per_scope_and_args() {
        let mut host = Host::new(&["term"]);
        let args = "{Close} {Kill}";
        assert!(execute_togglecmd(&mut host, args, None, 0));
        assert!(execute_togglecmd(&mut host, args, None, 0));
        assert!(execute_togglecmd(&mut host, args, None, 0));
        let actions: Vec<_> = host.execs.iter().map(|(a, _)| *a).collect();
        assert_eq!(vec![Action::Close, Action::Kill, Action::Close], actions);
        // A different scope rotates independently
        host.execs.clear();
        host.scope = 8;
        assert!(execute_togglecmd(&mut host, args, None, 0));
        assert_eq!(vec![Action::Close], host.execs.iter().map(|(a, _)| *a).collect::<Vec<_>>());
    }

    #[test]
    fn macro_runs_all_and_reports_any_success() {
        let mut host = Host::new(&["term"]);
        assert!(execute_macro(&mut host, "{Close} {Kill}", None, 0));
        assert_eq!(2, host.execs.len());
        // Unresolvable members do not sink the macro
        host.execs.clear();
        assert!(execute_macro(&mut host, "{bogus} {Close}", None, 0));
        assert_eq!(1, host.execs.len());
        assert!(!execute_macro(&mut host, "{bogus}", None, 0));
    }

    #[test]
    fn delay_parses_interval_and_replaces() {
        let mut host = Host::new(&["term"]);
        assert!(super::execute_delay(&mut host, "{Close} 5000", 0));
        assert_eq!(1, host.delays.len());
        assert_eq!((7, "Close".to_string(), 5000), {
            let d = &host.delays[0];
            (d.0, d.2.clone(), d.3)
        });
        // Default interval
        assert!(super::execute_delay(&mut host, "{Kill}", 0));
        assert_eq!(200, host.delays[1].3);
        assert!(!super::execute_delay(&mut host, "no braces", 0));
    }

    #[test]
    fn delay_msec_clamps_to_one() {
        assert_eq!(1, delay_msec(0));
        assert_eq!(1, delay_msec(200));
        assert_eq!(1, delay_msec(1000));
        assert_eq!(2, delay_msec(1001));
        assert_eq!(5, delay_msec(5000));
    }
}
