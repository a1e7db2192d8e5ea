//! Named hook injection into WGSL templates.
//!
//! A template marks each extension point with a line of the form
//! `//!hook:<name>`. [`ShaderTemplate::inject`] replaces every marker with
//! the matching hook body; markers without a body become empty lines.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

/// Prefix of a hook marker line.
pub const HOOK_MARKER: &str = "//!hook:";

/// The extension points a template may expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Module-scope items: bindings, structs, helper functions.
    Declarations,
    /// Inside the vertex entry point; may reassign `position`.
    VertexPosition,
    /// Start of the fragment entry point; may `discard`.
    FragmentDiscard,
    /// After the base surface inputs are filled; may modify `surface`.
    FragmentSurface,
}

impl HookPoint {
    /// Every hook point in source order.
    pub const ALL: [HookPoint; 4] = [
        HookPoint::Declarations,
        HookPoint::VertexPosition,
        HookPoint::FragmentDiscard,
        HookPoint::FragmentSurface,
    ];

    /// Name used in `//@hook` markers.
    pub fn name(self) -> &'static str {
        match self {
            HookPoint::Declarations => "declarations",
            HookPoint::VertexPosition => "vertex_position",
            HookPoint::FragmentDiscard => "fragment_discard",
            HookPoint::FragmentSurface => "fragment_surface",
        }
    }

    /// Inverse of [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.name() == name)
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while injecting hooks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown hook `{0}`")]
    UnknownHook(String),
    #[error("hook `{0}` supplied more than once")]
    DuplicateHook(String),
    #[error("template `{template}` has no `{hook}` marker")]
    MissingMarker { template: String, hook: HookPoint },
}

/// A WGSL source with hook markers.
#[derive(Clone, Debug)]
pub struct ShaderTemplate {
    label: String,
    source: String,
}

impl ShaderTemplate {
    /// Template named `label`; markers are parsed on use.
    pub fn new(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
        }
    }

    /// Name used in error messages and shader labels.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Unexpanded source, markers included.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names following every marker, in source order.
    fn marker_names(&self) -> impl Iterator<Item = &str> {
        self.source
            .lines()
            .filter_map(|line| line.trim().strip_prefix(HOOK_MARKER))
            .map(str::trim)
    }

    /// Hook points marked in this template.
    ///
    /// Fails on a marker naming an unknown hook.
    pub fn markers(&self) -> Result<Vec<HookPoint>, TemplateError> {
        self.marker_names()
            .map(|name| {
                HookPoint::from_name(name)
                    .ok_or_else(|| TemplateError::UnknownHook(name.to_string()))
            })
            .collect()
    }

    /// Substitute hook bodies by name.
    pub fn inject(&self, hooks: &[(&str, &str)]) -> Result<String, TemplateError> {
        let available = self.markers()?;

        let mut seen = HashSet::new();
        for (name, _) in hooks {
            let point = HookPoint::from_name(name)
                .ok_or_else(|| TemplateError::UnknownHook(name.to_string()))?;
            if !seen.insert(point) {
                return Err(TemplateError::DuplicateHook(name.to_string()));
            }
            if !available.contains(&point) {
                return Err(TemplateError::MissingMarker {
                    template: self.label.clone(),
                    hook: point,
                });
            }
        }

        let hook_len: usize = hooks.iter().map(|(_, body)| body.len()).sum();
        let mut out = String::with_capacity(self.source.len() + hook_len);
        for line in self.source.lines() {
            match line.trim().strip_prefix(HOOK_MARKER) {
                Some(name) => {
                    let name = name.trim();
                    if let Some((_, body)) = hooks.iter().find(|(n, _)| *n == name) {
                        out.push_str(body);
                    }
                }
                None => out.push_str(line),
            }
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "a\n//!hook:declarations\nfn f() {\n    //!hook:vertex_position\n}\n";

    #[test]
    fn test_markers_in_order() {
        let t = ShaderTemplate::new("t", TEMPLATE);
        assert_eq!(
            t.markers().unwrap(),
            vec![HookPoint::Declarations, HookPoint::VertexPosition]
        );
    }

    #[test]
    fn test_inject_replaces_markers() {
        let t = ShaderTemplate::new("t", TEMPLATE);
        let out = t
            .inject(&[("vertex_position", "    position = position * 2.0;")])
            .unwrap();
        assert!(out.contains("position = position * 2.0;"));
        assert!(!out.contains(HOOK_MARKER), "unfilled markers must vanish: {out:?}");
    }

    #[test]
    fn test_no_hooks_strips_markers() {
        let t = ShaderTemplate::new("t", TEMPLATE);
        let out = t.inject(&[]).unwrap();
        assert_eq!(out, "a\n\nfn f() {\n\n}\n");
    }

    #[test]
    fn test_unknown_hook_rejected() {
        let t = ShaderTemplate::new("t", TEMPLATE);
        assert_eq!(
            t.inject(&[("fragment_colour", "")]),
            Err(TemplateError::UnknownHook("fragment_colour".into()))
        );
    }

    #[test]
    fn test_missing_marker_rejected() {
        let t = ShaderTemplate::new("t", TEMPLATE);
        assert_eq!(
            t.inject(&[("fragment_surface", "")]),
            Err(TemplateError::MissingMarker {
                template: "t".into(),
                hook: HookPoint::FragmentSurface
            })
        );
    }

    #[test]
    fn test_duplicate_hook_rejected() {
        let t = ShaderTemplate::new("t", TEMPLATE);
        assert_eq!(
            t.inject(&[("declarations", "x"), ("declarations", "y")]),
            Err(TemplateError::DuplicateHook("declarations".into()))
        );
    }

    #[test]
    fn test_unknown_marker_in_template_rejected() {
        let t = ShaderTemplate::new("t", "//!hook:bogus\n");
        assert_eq!(t.markers(), Err(TemplateError::UnknownHook("bogus".into())));
    }

    #[test]
    fn test_names_round_trip() {
        for point in HookPoint::ALL {
            assert_eq!(HookPoint::from_name(point.name()), Some(point));
        }
    }
}
