use crate::env::Environment;
use crate::error::ConfigError;
use crate::node::Node;
use crate::overrides;
use crate::path::ConfPath;
use crate::resolve::{self, OverrideSource, Resolved, ResolveInput};
use crate::schema::ConfigOption;
use crate::syntax::{self, Assignment};
use crate::types::CrossInheritance;

/// Entry point for resolving configuration against a schema.
pub struct Resolver;

impl Resolver {
    pub fn builder(schema: &ConfigOption) -> ResolverBuilder<'_> {
        ResolverBuilder::new(schema)
    }
}

/// An override layer as the caller handed it in. Text is parsed when the
/// input is built, so the fluent methods never fail.
#[derive(Debug, Clone)]
enum Layer {
    Document(OverrideSource),
    File {
        name: String,
        text: String,
        target: ConfPath,
    },
}

/// Builder for collecting documents, override layers and the environment,
/// then running the pipeline.
///
/// Override layers apply in the order they are added. CLI overrides always
/// come last, so they win over every override document.
pub struct ResolverBuilder<'s> {
    schema: &'s ConfigOption,
    documents: Vec<(String, Node)>,
    layers: Vec<Layer>,
    cli: Vec<String>,
    assignments: Vec<Assignment>,
    cli_target: ConfPath,
    env: Environment,
    cross: Vec<CrossInheritance>,
}

impl<'s> ResolverBuilder<'s> {
    fn new(schema: &'s ConfigOption) -> Self {
        Self {
            schema,
            documents: Vec::new(),
            layers: Vec::new(),
            cli: Vec::new(),
            assignments: Vec::new(),
            cli_target: ConfPath::root(),
            env: Environment::new(),
            cross: Vec::new(),
        }
    }

    /// Add a main document. `name` must be a child of the schema root.
    pub fn document(mut self, name: impl Into<String>, document: impl Into<Node>) -> Self {
        self.documents.push((name.into(), document.into()));
        self
    }

    /// Add a document that is merged into the value at `target`.
    pub fn override_document(
        mut self,
        name: impl Into<String>,
        document: impl Into<Node>,
        target: impl Into<ConfPath>,
    ) -> Self {
        self.layers.push(Layer::Document(OverrideSource {
            name: name.into(),
            document: document.into(),
            target: target.into(),
        }));
        self
    }

    /// Add a file of override assignments, one per line, applied at `target`.
    pub fn override_file(
        mut self,
        name: impl Into<String>,
        text: impl Into<String>,
        target: impl Into<ConfPath>,
    ) -> Self {
        self.layers.push(Layer::File {
            name: name.into(),
            text: text.into(),
            target: target.into(),
        });
        self
    }

    /// Add a single `key<action>value` override, e.g. `cmake.args+=["-G"]`.
    pub fn cli_override(mut self, text: impl Into<String>) -> Self {
        self.cli.push(text.into());
        self
    }

    pub fn cli_overrides<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cli.extend(texts.into_iter().map(Into::into));
        self
    }

    /// Add an already parsed override. Applied after the textual CLI
    /// overrides, at the CLI target.
    pub fn assignment(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    /// Where CLI overrides apply (default: the schema root, so keys start
    /// with the document name).
    pub fn cli_target(mut self, target: impl Into<ConfPath>) -> Self {
        self.cli_target = target.into();
        self
    }

    /// Add environment variables to the snapshot.
    pub fn env<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in vars {
            self.env.set(name, value);
        }
        self
    }

    /// Replace the environment snapshot.
    pub fn env_snapshot(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Snapshot the process environment.
    pub fn process_env(self) -> Self {
        self.env_snapshot(Environment::capture())
    }

    pub fn cross_inheritance(mut self, cross: CrossInheritance) -> Self {
        self.cross.push(cross);
        self
    }

    /// Parse every textual override and assemble the pipeline input.
    pub fn build_input(&self) -> Result<ResolveInput, ConfigError> {
        let mut overrides = Vec::new();
        for layer in &self.layers {
            match layer {
                Layer::Document(source) => overrides.push(source.clone()),
                Layer::File { name, text, target } => {
                    let assignments = syntax::parse_assignments(text)?;
                    overrides.extend(
                        overrides::assignments_to_documents(assignments)
                            .into_iter()
                            .enumerate()
                            .map(|(i, document)| OverrideSource {
                                name: format!("{name}[{i}]"),
                                document,
                                target: target.clone(),
                            }),
                    );
                }
            }
        }

        let mut assignments = self
            .cli
            .iter()
            .map(|text| syntax::parse_assignment(text))
            .collect::<Result<Vec<_>, _>>()?;
        assignments.extend(self.assignments.iter().cloned());
        // One document per CLI override, so each applies on top of the last.
        overrides.extend(assignments.into_iter().enumerate().map(|(i, assignment)| {
            OverrideSource {
                name: format!("<cli:{i}>"),
                document: overrides::assignment_to_document(assignment),
                target: self.cli_target.clone(),
            }
        }));

        Ok(ResolveInput {
            documents: self.documents.clone(),
            overrides,
            env: self.env.clone(),
            cross: self.cross.clone(),
        })
    }

    /// Run the full pipeline.
    pub fn resolve(self) -> Result<Resolved, ConfigError> {
        let input = self.build_input()?;
        resolve::resolve(self.schema, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures::test::{doc, project_schema};
    use crate::types::OverrideAction;

    const PBC: &str = "pyproject.toml/tool/pbc";

    fn project(text: &str) -> Node {
        doc(text)
    }

    fn value_at<'a>(resolved: &'a Resolved, path: &str) -> Option<&'a toml::Value> {
        resolved.get(&ConfPath::parse(&format!("pyproject.toml/tool/pbc/{path}")))
    }

    #[test]
    fn defaults_without_overrides() {
        let schema = project_schema();
        let resolved = Resolver::builder(&schema)
            .document("pyproject.toml", project("[tool.pbc]"))
            .resolve()
            .unwrap();
        assert_eq!(
            value_at(&resolved, "cmake/build_type").and_then(toml::Value::as_str),
            Some("Release")
        );
    }

    #[test]
    fn cli_overrides_default_to_the_schema_root() {
        let schema = project_schema();
        let resolved = Resolver::builder(&schema)
            .document("pyproject.toml", project("[tool.pbc]"))
            .cli_override("pyproject.toml.tool.pbc.cmake.build_type=Debug")
            .resolve()
            .unwrap();
        assert_eq!(
            value_at(&resolved, "cmake/build_type").and_then(toml::Value::as_str),
            Some("Debug")
        );
    }

    #[test]
    fn cli_target_shortens_keys() {
        let schema = project_schema();
        let resolved = Resolver::builder(&schema)
            .document("pyproject.toml", project("[tool.pbc.cmake]\nargs = [\"-a\"]"))
            .cli_target(PBC)
            .cli_overrides(["cmake.args+=[\"-b\"]", "cmake.args-=-a"])
            .resolve()
            .unwrap();
        assert_eq!(
            value_at(&resolved, "cmake/args"),
            Some(&toml::Value::Array(vec!["-b".into()]))
        );
    }

    #[test]
    fn cli_wins_over_override_files() {
        let schema = project_schema();
        let resolved = Resolver::builder(&schema)
            .document("pyproject.toml", project("[tool.pbc]"))
            .cli_target(PBC)
            .cli_override("cmake.build_type=MinSizeRel")
            .override_file("pyproject.local.toml", "cmake.build_type = Debug\n", PBC)
            .resolve()
            .unwrap();
        assert_eq!(
            value_at(&resolved, "cmake/build_type").and_then(toml::Value::as_str),
            Some("MinSizeRel")
        );
    }

    #[test]
    fn override_files_are_labelled_per_document() {
        let schema = project_schema();
        let input = Resolver::builder(&schema)
            .override_file(
                "local",
                "# comment\ncmake.args += [\"-x\"]\ncmake.args += [\"-y\"]\n",
                PBC,
            )
            .build_input()
            .unwrap();
        let names: Vec<_> = input.overrides.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["local[0]", "local[1]"]);
    }

    #[test]
    fn layers_keep_their_order_before_cli() {
        let schema = project_schema();
        let input = Resolver::builder(&schema)
            .cli_override("a=1")
            .override_document("first", doc("x = 1"), PBC)
            .override_file("second", "y = 2", PBC)
            .assignment(Assignment {
                action: OverrideAction::Assign,
                key: ConfPath::parse("b"),
                value: Node::Int(2),
            })
            .build_input()
            .unwrap();
        let names: Vec<_> = input.overrides.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["first", "second[0]", "<cli:0>", "<cli:1>"]);
        assert_eq!(input.overrides[2].target, ConfPath::root());
    }

    #[test]
    fn syntax_errors_surface_from_build() {
        let schema = project_schema();
        let err = Resolver::builder(&schema)
            .cli_override("no action here")
            .build_input()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn environment_pairs_accumulate() {
        let schema = project_schema();
        let input = Resolver::builder(&schema)
            .env([("A", "1")])
            .env([("B", "2")])
            .build_input()
            .unwrap();
        assert_eq!(input.env.get("A"), Some("1"));
        assert_eq!(input.env.get("B"), Some("2"));
    }

    #[test]
    fn env_snapshot_feeds_environment_defaults() {
        let schema = project_schema();
        let resolved = Resolver::builder(&schema)
            .document("pyproject.toml", project("[tool.pbc]"))
            .env_snapshot(Environment::from_vars([("CMAKE_GENERATOR", "Ninja")]))
            .resolve()
            .unwrap();
        assert_eq!(
            value_at(&resolved, "cmake/generator").and_then(toml::Value::as_str),
            Some("Ninja")
        );
    }

    #[test]
    fn cross_inheritance_is_passed_through() {
        let schema = project_schema();
        let resolved = Resolver::builder(&schema)
            .document(
                "pyproject.toml",
                project(
                    "[tool.pbc.mac.cmake]\nargs = [\"-mac\"]\n[tool.pbc.cross]\nos = \"mac\"",
                ),
            )
            .cross_inheritance(CrossInheritance {
                selector: ConfPath::parse("pyproject.toml/tool/pbc/cross/os"),
                platforms: ConfPath::parse(PBC),
                target: ConfPath::parse("pyproject.toml/tool/pbc/cross"),
                sections: vec!["cmake".into()],
            })
            .resolve()
            .unwrap();
        assert_eq!(
            value_at(&resolved, "cross/cmake/args"),
            Some(&toml::Value::Array(vec!["-mac".into()]))
        );
    }
}
