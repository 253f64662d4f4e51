use regex::Regex;

use crate::geometry::head_map::{head_at, Output};
use crate::state::layer::StackLayer;
use crate::state::view::View;
use crate::state::WmCore;

/// Evaluation context: the focused view, cursor head and workspace names all
/// come from here rather than from the view under test.
pub struct PatternEnv<'a> {
    pub core: &'a WmCore,
    pub outputs: &'a [Output],
    pub cursor: Option<(i32, i32)>,
    pub current_ws: i32,
}

impl PatternEnv<'_> {
    fn focused(&self) -> Option<&View> {
        self.core.focused.and_then(|id| self.core.view(id))
    }

    fn cursor_head(&self) -> Option<usize> {
        let (x, y) = self.cursor?;
        Some(head_at(self.outputs, x, y))
    }
}

#[derive(Debug, Clone, Copy)]
struct BoolTerm {
    negate: bool,
    current: bool,
    value: bool,
}

#[derive(Debug)]
struct RegexTerm {
    negate: bool,
    current: bool,
    /// `None` after a failed compile; such a term never matches.
    regex: Option<Regex>,
}

#[derive(Debug, Clone, Copy)]
enum WorkspaceTerm {
    Current,
    Index(i32),
}

#[derive(Debug, Clone, Copy)]
enum HeadTerm {
    Current,
    Mouse,
    Index(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerKind {
    AboveDock,
    Dock,
    Top,
    Normal,
    Bottom,
    Desktop,
}

#[derive(Debug, Clone, Copy)]
enum LayerTerm {
    Current,
    Kind(LayerKind),
}

#[derive(Debug, Clone, Copy)]
enum ScreenTerm {
    Current,
    Index(i32),
}

#[derive(Debug)]
struct XpropTerm {
    name: String,
    negate: bool,
    regex: Option<Regex>,
}

/// A compiled `(key=value key!=value ...)` client pattern. Later terms for
/// the same key overwrite earlier ones.
#[derive(Debug, Default)]
pub struct ClientPattern {
    workspace: Option<(bool, WorkspaceTerm)>,
    minimized: Option<BoolTerm>,
    maximized: Option<BoolTerm>,
    maximized_h: Option<BoolTerm>,
    maximized_v: Option<BoolTerm>,
    fullscreen: Option<BoolTerm>,
    shaded: Option<BoolTerm>,
    stuck: Option<BoolTerm>,
    transient: Option<BoolTerm>,
    urgent: Option<BoolTerm>,
    icon_hidden: Option<BoolTerm>,
    focus_hidden: Option<BoolTerm>,
    workspace_name: Option<RegexTerm>,
    head: Option<(bool, HeadTerm)>,
    layer: Option<(bool, LayerTerm)>,
    screen: Option<(bool, ScreenTerm)>,
    title: Option<RegexTerm>,
    name: Option<RegexTerm>,
    role: Option<RegexTerm>,
    class: Option<RegexTerm>,
    xprops: Vec<XpropTerm>,
}

fn compile_anchored(pattern: &str, why: &str) -> Option<Regex> {
    match Regex::new(&format!("^{pattern}$")) {
        Ok(re) => Some(re),
        Err(err) => {
            fluxway_utils::debug!("Pattern: invalid regex {}='{}': {}", why, pattern, err);
            None
        }
    }
}

fn parse_yes_no(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_int_arg(s: &str) -> Option<i32> {
    let v: i64 = s.trim().parse().ok()?;
    if !(-100_000..=100_000).contains(&v) {
        return None;
    }
    Some(v as i32)
}

fn parse_layer_kind(s: &str) -> Option<LayerKind> {
    match s.to_ascii_lowercase().as_str() {
        "abovedock" => Some(LayerKind::AboveDock),
        "dock" => Some(LayerKind::Dock),
        "top" => Some(LayerKind::Top),
        "normal" => Some(LayerKind::Normal),
        "bottom" => Some(LayerKind::Bottom),
        "desktop" => Some(LayerKind::Desktop),
        _ => None,
    }
}

fn is_known_key(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "workspace"
            | "minimized"
            | "maximized"
            | "maximizedhorizontal"
            | "maximizedvertical"
            | "fullscreen"
            | "shaded"
            | "stuck"
            | "sticky"
            | "transient"
            | "urgent"
            | "iconhidden"
            | "focushidden"
            | "workspacename"
            | "head"
            | "layer"
            | "screen"
            | "title"
            | "name"
            | "role"
            | "class"
            | "app_id"
            | "appid"
    )
}

const CURRENT: &str = "[current]";
const MOUSE: &str = "[mouse]";

impl ClientPattern {
    /// Compile a pattern string: a sequence of parenthesized term groups.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let mut out = ClientPattern::default();
        let mut rest = pattern;
        while let Some(open) = rest.find('(') {
            let Some(close_rel) = rest[open + 1..].find(')') else {
                break;
            };
            let inside = &rest[open + 1..open + 1 + close_rel];
            for term in inside.split_whitespace() {
                out.parse_term(term);
            }
            rest = &rest[open + 1 + close_rel + 1..];
        }
        out
    }

    fn parse_term(&mut self, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        let (key, value, negate) = if let Some(pos) = term.find("!=") {
            (term[..pos].trim(), term[pos + 2..].trim(), true)
        } else if let Some(pos) = term.find('=') {
            (term[..pos].trim(), term[pos + 1..].trim(), false)
        } else if is_known_key(term) || (term.starts_with('@') && term.len() > 1) {
            (term, CURRENT, false)
        } else {
            // Pattern default property is Name (instance)
            self.name = Some(RegexTerm {
                negate: false,
                current: false,
                regex: compile_anchored(term, "name"),
            });
            return;
        };
        if key.is_empty() || value.is_empty() {
            return;
        }

        if let Some(prop) = key.strip_prefix('@') {
            if !prop.is_empty() {
                self.xprops.push(XpropTerm {
                    name: prop.to_string(),
                    negate,
                    regex: compile_anchored(value, key),
                });
            }
            return;
        }

        let lower = key.to_ascii_lowercase();
        match lower.as_str() {
            "workspace" => {
                if value.eq_ignore_ascii_case(CURRENT) {
                    self.workspace = Some((negate, WorkspaceTerm::Current));
                } else if let Some(ws) = parse_int_arg(value) {
                    self.workspace = Some((negate, WorkspaceTerm::Index(ws)));
                } else {
                    self.workspace = None;
                }
            }
            "minimized" => self.minimized = bool_term(value, negate),
            "maximized" => self.maximized = bool_term(value, negate),
            "maximizedhorizontal" => self.maximized_h = bool_term(value, negate),
            "maximizedvertical" => self.maximized_v = bool_term(value, negate),
            "fullscreen" => self.fullscreen = bool_term(value, negate),
            "shaded" => self.shaded = bool_term(value, negate),
            "stuck" | "sticky" => self.stuck = bool_term(value, negate),
            "transient" => self.transient = bool_term(value, negate),
            "urgent" => self.urgent = bool_term(value, negate),
            "iconhidden" => self.icon_hidden = bool_term(value, negate),
            "focushidden" => self.focus_hidden = bool_term(value, negate),
            "workspacename" => {
                self.workspace_name = Some(regex_term(value, negate, "workspacename"));
            }
            "head" => {
                if value.eq_ignore_ascii_case(CURRENT) {
                    self.head = Some((negate, HeadTerm::Current));
                } else if value.eq_ignore_ascii_case(MOUSE) {
                    self.head = Some((negate, HeadTerm::Mouse));
                } else if let Some(h) = parse_int_arg(value) {
                    self.head = Some((negate, HeadTerm::Index(h)));
                } else {
                    self.head = None;
                }
            }
            "layer" => {
                if value.eq_ignore_ascii_case(CURRENT) {
                    self.layer = Some((negate, LayerTerm::Current));
                } else if let Some(kind) = parse_layer_kind(value) {
                    self.layer = Some((negate, LayerTerm::Kind(kind)));
                } else {
                    self.layer = Some((negate, LayerTerm::Kind(LayerKind::Normal)));
                }
            }
            "screen" => {
                if value.eq_ignore_ascii_case(CURRENT) {
                    self.screen = Some((negate, ScreenTerm::Current));
                } else if let Some(s) = parse_int_arg(value) {
                    self.screen = Some((negate, ScreenTerm::Index(s)));
                }
            }
            "title" => self.title = Some(regex_term(value, negate, "title")),
            "name" => self.name = Some(regex_term(value, negate, "name")),
            "role" => self.role = Some(regex_term(value, negate, "role")),
            "class" | "app_id" | "appid" => self.class = Some(regex_term(value, negate, "class")),
            _ => {}
        }
    }

    /// Full-match evaluation against one view.
    #[must_use]
    pub fn matches(&self, env: &PatternEnv, view: &View) -> bool {
        let focused = env.focused();

        if let Some((negate, term)) = self.workspace {
            let mut ok = if view.sticky {
                true
            } else {
                match term {
                    WorkspaceTerm::Current => view.workspace == env.current_ws,
                    WorkspaceTerm::Index(ws) => view.workspace == ws,
                }
            };
            if negate {
                ok = !ok;
            }
            if !ok {
                return false;
            }
        }

        let bool_checks: [(&Option<BoolTerm>, fn(&View) -> bool); 11] = [
            (&self.minimized, |v| v.minimized),
            (&self.maximized, |v| v.maximized),
            (&self.maximized_h, |v| v.maximized_h),
            (&self.maximized_v, |v| v.maximized_v),
            (&self.fullscreen, |v| v.fullscreen),
            (&self.shaded, |v| v.shaded),
            (&self.stuck, |v| v.sticky),
            (&self.transient, |v| v.transient),
            (&self.urgent, View::is_urgent),
            (&self.icon_hidden, |v| v.icon_hidden),
            (&self.focus_hidden, |v| v.focus_hidden),
        ];
        for (term, get) in bool_checks {
            let Some(term) = term else { continue };
            let mut ok = if term.current {
                focused.is_some_and(|f| get(view) == get(f))
            } else {
                get(view) == term.value
            };
            if term.negate {
                ok = !ok;
            }
            if !ok {
                return false;
            }
        }

        if let Some(term) = &self.workspace_name {
            let ws_name = env.core.workspace_name(view.workspace);
            let mut ok = if term.current {
                ws_name == env.core.workspace_name(env.current_ws)
            } else {
                term.regex.as_ref().is_some_and(|re| re.is_match(ws_name))
            };
            if term.negate {
                ok = !ok;
            }
            if !ok {
                return false;
            }
        }

        if let Some((negate, term)) = self.head {
            let mut ok = match term {
                HeadTerm::Mouse => env
                    .cursor_head()
                    .is_some_and(|mouse| view.head == mouse),
                HeadTerm::Current => focused.is_some_and(|f| view.head == f.head),
                // One-based in pattern text
                HeadTerm::Index(h) => h >= 1 && view.head == (h - 1) as usize,
            };
            if negate {
                ok = !ok;
            }
            if !ok {
                return false;
            }
        }

        if let Some((negate, term)) = self.layer {
            let kind = view_layer_kind(view);
            let mut ok = match term {
                LayerTerm::Current => focused.is_some_and(|f| kind == view_layer_kind(f)),
                // `dock` has no scene layer of its own, it lives in `top`
                LayerTerm::Kind(LayerKind::Dock) => kind == LayerKind::Top,
                LayerTerm::Kind(want) => kind == want,
            };
            if negate {
                ok = !ok;
            }
            if !ok {
                return false;
            }
        }

        if let Some((negate, term)) = self.screen {
            // Single-screen world: [current] needs a focused view, numeric
            // screens only exist as screen 0
            let mut ok = match term {
                ScreenTerm::Current => focused.is_some(),
                ScreenTerm::Index(s) => s == 0,
            };
            if negate {
                ok = !ok;
            }
            if !ok {
                return false;
            }
        }

        for term in &self.xprops {
            let Some(re) = &term.regex else { return false };
            let text = view
                .legacy
                .as_ref()
                .and_then(|l| l.prop(&term.name))
                .unwrap_or("");
            let mut ok = re.is_match(text);
            if term.negate {
                ok = !ok;
            }
            if !ok {
                return false;
            }
        }

        let regex_checks: [(&Option<RegexTerm>, &str, Option<&str>); 4] = [
            (
                &self.title,
                view.effective_title(),
                focused.map(View::effective_title),
            ),
            (&self.name, view.instance(), focused.map(View::instance)),
            (&self.role, view.role(), focused.map(View::role)),
            (
                &self.class,
                view.app_id.as_str(),
                focused.map(|f| f.app_id.as_str()),
            ),
        ];
        for (term, candidate, focused_value) in regex_checks {
            let Some(term) = term else { continue };
            let mut ok = if term.current {
                match focused_value {
                    Some(f) => candidate == f,
                    None => return false,
                }
            } else {
                match &term.regex {
                    Some(re) => re.is_match(candidate),
                    None => return false,
                }
            };
            if term.negate {
                ok = !ok;
            }
            if !ok {
                return false;
            }
        }

        true
    }

    /// The iconbar variant: icon-hidden views are filtered up front, as if
    /// `(iconhidden=no)` were appended to the pattern.
    #[must_use]
    pub fn matches_iconbar(&self, env: &PatternEnv, view: &View) -> bool {
        if view.icon_hidden {
            return false;
        }
        self.matches(env, view)
    }
}

fn bool_term(value: &str, negate: bool) -> Option<BoolTerm> {
    if value.eq_ignore_ascii_case(CURRENT) {
        return Some(BoolTerm {
            negate,
            current: true,
            value: false,
        });
    }
    parse_yes_no(value).map(|v| BoolTerm {
        negate,
        current: false,
        value: v,
    })
}

fn regex_term(value: &str, negate: bool, why: &str) -> RegexTerm {
    if value.eq_ignore_ascii_case(CURRENT) {
        RegexTerm {
            negate,
            current: true,
            regex: None,
        }
    } else {
        RegexTerm {
            negate,
            current: false,
            regex: compile_anchored(value, why),
        }
    }
}

fn view_layer_kind(view: &View) -> LayerKind {
    match view.base_layer {
        StackLayer::Overlay => LayerKind::AboveDock,
        StackLayer::Top => LayerKind::Top,
        StackLayer::Normal => LayerKind::Normal,
        StackLayer::Bottom => LayerKind::Bottom,
        StackLayer::Background => LayerKind::Desktop,
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientPattern, PatternEnv};
    use crate::geometry::head_map::Output;
    use crate::geometry::Rect;
    use crate::state::layer::StackLayer;
    use crate::state::view::{ViewId, ViewKind};
    use crate::state::WmCore;

    struct Fixture {
        core: WmCore,
        outputs: Vec<Output>,
        a: ViewId,
        b: ViewId,
    }

    fn fixture() -> Fixture {
        let mut core = WmCore::new();
        core.set_workspace_count(4);
        let a = core.create_view(ViewKind::Native);
        core.map_view(a);
        {
            let v = core.view_mut(a).unwrap();
            v.title = "Mail".to_string();
            v.app_id = "thunderbird".to_string();
            v.width = 100;
            v.height = 100;
        }
        let b = core.create_view(ViewKind::Legacy);
        core.map_view(b);
        {
            let v = core.view_mut(b).unwrap();
            v.title = "xterm".to_string();
            v.app_id = "XTerm".to_string();
            let legacy = v.legacy.as_mut().unwrap();
            legacy.instance = "xterm".to_string();
            legacy.role = "terminal".to_string();
            legacy.set_prop("_MY_MARKER", "42");
            v.width = 100;
            v.height = 100;
        }
        let outputs = vec![
            Output::new("A", Rect::new(0, 0, 1000, 500)),
            Output::new("B", Rect::new(1000, 0, 1000, 500)),
        ];
        Fixture {
            core,
            outputs,
            a,
            b,
        }
    }

    fn env<'a>(fx: &'a Fixture) -> PatternEnv<'a> {
        PatternEnv {
            core: &fx.core,
            outputs: &fx.outputs,
            cursor: Some((10, 10)),
            current_ws: fx.core.workspace_current(),
        }
    }

    #[test]
    fn class_and_title_are_anchored_regexes() {
        let fx = fixture();
        let pat = ClientPattern::parse("(class=thunder.*)");
        assert!(pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.b).unwrap()));
        // Anchoring: substring without wildcard fails
        let pat = ClientPattern::parse("(class=thunder)");
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        let pat = ClientPattern::parse("(title!=Mail)");
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        assert!(pat.matches(&env(&fx), fx.core.view(fx.b).unwrap()));
    }

    #[test]
    fn bare_term_matches_instance_name() {
        let fx = fixture();
        let pat = ClientPattern::parse("(xterm)");
        assert!(pat.matches(&env(&fx), fx.core.view(fx.b).unwrap()));
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
    }

    #[test]
    fn workspace_terms_and_sticky_override() {
        let mut fx = fixture();
        fx.core.view_mut(fx.a).unwrap().workspace = 3;
        let pat = ClientPattern::parse("(workspace=3)");
        // Pattern workspace is taken verbatim (zero-based like the command arg)
        assert!(pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.b).unwrap()));
        let pat = ClientPattern::parse("(workspace=[current])");
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        assert!(pat.matches(&env(&fx), fx.core.view(fx.b).unwrap()));
        // Sticky views sit on every workspace
        fx.core.view_mut(fx.a).unwrap().sticky = true;
        assert!(pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
    }

    #[test]
    fn current_comparisons_need_a_focused_view() {
        let mut fx = fixture();
        let pat = ClientPattern::parse("(minimized=[current])");
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        fx.core.focused = Some(fx.b);
        assert!(pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        fx.core.view_mut(fx.a).unwrap().minimized = true;
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        let pat = ClientPattern::parse("(class=[current])");
        assert!(pat.matches(&env(&fx), fx.core.view(fx.b).unwrap()));
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
    }

    #[test]
    fn head_terms() {
        let mut fx = fixture();
        fx.core.view_mut(fx.b).unwrap().head = 1;
        let pat = ClientPattern::parse("(head=2)");
        assert!(pat.matches(&env(&fx), fx.core.view(fx.b).unwrap()));
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        // Cursor sits on head 0
        let pat = ClientPattern::parse("(head=[mouse])");
        assert!(pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.b).unwrap()));
    }

    #[test]
    fn layer_terms_with_dock_aliasing() {
        let mut fx = fixture();
        fx.core.view_mut(fx.a).unwrap().base_layer = StackLayer::Top;
        let pat = ClientPattern::parse("(layer=top)");
        assert!(pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        // `dock` matches the top bucket too
        let pat = ClientPattern::parse("(layer=dock)");
        assert!(pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        let pat = ClientPattern::parse("(layer!=normal)");
        assert!(pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.b).unwrap()));
    }

    #[test]
    fn xprop_terms_match_legacy_properties() {
        let fx = fixture();
        let pat = ClientPattern::parse("(@_MY_MARKER=42)");
        assert!(pat.matches(&env(&fx), fx.core.view(fx.b).unwrap()));
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        let pat = ClientPattern::parse("(@_MY_MARKER!=42)");
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.b).unwrap()));
    }

    #[test]
    fn invalid_regex_never_matches() {
        let fx = fixture();
        let pat = ClientPattern::parse("(title=[)");
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        // Even negated: the term is simply dead
        let pat = ClientPattern::parse("(title!=[)");
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
    }

    #[test]
    fn iconbar_variant_rejects_icon_hidden() {
        let mut fx = fixture();
        let pat = ClientPattern::parse("");
        assert!(pat.matches_iconbar(&env(&fx), fx.core.view(fx.a).unwrap()));
        fx.core.view_mut(fx.a).unwrap().icon_hidden = true;
        assert!(!pat.matches_iconbar(&env(&fx), fx.core.view(fx.a).unwrap()));
        assert!(pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
    }

    #[test]
    fn later_terms_overwrite_earlier_same_key() {
        let fx = fixture();
        let pat = ClientPattern::parse("(minimized=yes) (minimized=no)");
        assert!(pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
    }

    #[test]
    fn screen_is_always_head_zero() {
        let mut fx = fixture();
        let pat = ClientPattern::parse("(screen=0)");
        assert!(pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        let pat = ClientPattern::parse("(screen=1)");
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        let pat = ClientPattern::parse("(screen=[current])");
        assert!(!pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
        fx.core.focused = Some(fx.b);
        assert!(pat.matches(&env(&fx), fx.core.view(fx.a).unwrap()));
    }
}
