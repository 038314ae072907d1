#[cfg(test)]
pub mod test {
    use std::path::Path;

    use crate::default::DefaultValue;
    use crate::node::Node;
    use crate::path::ConfPath;
    use crate::schema::{BasePath, ConfigOption, OptionKind, PathOptions};

    /// Parse a TOML snippet into a raw document.
    pub fn doc(text: &str) -> Node {
        let table: toml::Table = text.parse().unwrap();
        Node::from(table)
    }

    /// A small schema touching every kind of option the merge machinery
    /// distinguishes.
    pub fn simple_schema() -> ConfigOption {
        ConfigOption::section("")
            .child(ConfigOption::section("s").child(ConfigOption::string("leaf")))
            .child(
                ConfigOption::section("build")
                    .child(ConfigOption::list("build_args"))
                    .child(ConfigOption::list("args"))
                    .child(ConfigOption::new("jobs", OptionKind::Int))
                    .child(ConfigOption::new(
                        "mode",
                        OptionKind::Enum(vec!["debug".into(), "release".into()]),
                    )),
            )
            .child(ConfigOption::unchecked("extra"))
            .child(
                ConfigOption::multi("multi")
                    .child(ConfigOption::string("leaf"))
                    .child(ConfigOption::string("other")),
            )
            .child(ConfigOption::new(
                "env",
                OptionKind::Dict {
                    expand_environment: false,
                },
            ))
    }

    /// Path options anchored at `project`.
    pub fn path_schema(project: &Path) -> ConfigOption {
        let base = BasePath::Project(project.to_path_buf());
        let dir = PathOptions {
            must_exist: true,
            is_folder: true,
            ..PathOptions::new(base.clone())
        };
        let package = PathOptions {
            is_folder: true,
            expected_contents: vec!["__init__.py".into()],
            ..PathOptions::new(base)
        };
        ConfigOption::section("")
            .child(ConfigOption::new("dir", OptionKind::Path(dir)))
            .child(ConfigOption::new("package", OptionKind::Path(package)))
    }

    pub const PROJECT: &str = "pyproject.toml";
    pub const COMMON_CMAKE: &str = "pyproject.toml/tool/pbc/cmake";

    fn cmake_settings() -> ConfigOption {
        ConfigOption::section("cmake")
            .describe("CMake configuration and build settings.")
            .default(DefaultValue::value(toml::Table::new()))
            .child(
                ConfigOption::string("build_type")
                    .describe("CMake build type.")
                    .default(DefaultValue::value("Release")),
            )
            .child(
                ConfigOption::list("args")
                    .describe("Extra arguments passed to the configure step.")
                    .default(DefaultValue::value(toml::Value::Array(Vec::new()))),
            )
            .child(ConfigOption::list("build_args"))
            .child(
                ConfigOption::string("generator")
                    .default(DefaultValue::env("CMAKE_GENERATOR")),
            )
            .child(ConfigOption::new("options", OptionKind::CMakeOptions))
    }

    /// A section whose `cmake` child inherits the common settings.
    fn platform(name: &str) -> ConfigOption {
        ConfigOption::section(name)
            .create_if_inheritance_target_exists()
            .child(
                ConfigOption::section("cmake")
                    .inherits(COMMON_CMAKE)
                    .create_if_inheritance_target_exists(),
            )
    }

    /// A build-backend layout: one document with common settings, per-platform
    /// sections, a cross-compilation section, an override option, reference
    /// defaults and a multi-indexed component list.
    pub fn project_schema() -> ConfigOption {
        let pbc = ConfigOption::section("pbc")
            .child(cmake_settings())
            .child(platform("linux"))
            .child(platform("windows"))
            .child(platform("mac"))
            .child(
                ConfigOption::section("cross")
                    .child(ConfigOption::new(
                        "os",
                        OptionKind::Enum(vec!["linux".into(), "windows".into(), "mac".into()]),
                    ))
                    .child(
                        ConfigOption::section("cmake")
                            .inherits(COMMON_CMAKE)
                            .create_if_inheritance_target_exists(),
                    ),
            )
            .child(ConfigOption::new(
                "patch",
                OptionKind::Override {
                    target: ConfPath::parse("pyproject.toml/tool/pbc"),
                },
            ))
            .child(
                ConfigOption::section("refs")
                    .child(ConfigOption::string("x").default(DefaultValue::relative("y")))
                    .child(ConfigOption::string("y").default(DefaultValue::relative("z")))
                    .child(ConfigOption::string("z").default(DefaultValue::value("42"))),
            )
            .child(
                ConfigOption::multi("component")
                    .child(ConfigOption::string("target"))
                    .child(ConfigOption::string("prefix")),
            );
        ConfigOption::section("")
            .child(ConfigOption::section(PROJECT).child(ConfigOption::section("tool").child(pbc)))
    }
}
