//! Option schema for the demo: a `pyproject.toml` with a `[tool.demo]`
//! section, per-platform overrides and a cross-compilation section.

use layerfig::{ConfPath, ConfigOption, CrossInheritance, DefaultValue, ListStyle, OptionKind};

pub const DOCUMENT: &str = "pyproject.toml";
pub const TOOL: &str = "pyproject.toml/tool/demo";
const COMMON: &str = "pyproject.toml/tool/demo/cmake";

fn cmake() -> ConfigOption {
    ConfigOption::section("cmake")
        .describe("CMake settings shared by every platform.")
        .default(DefaultValue::value(toml::Table::new()))
        .child(
            ConfigOption::string("build_type")
                .describe("CMAKE_BUILD_TYPE for single-config generators.")
                .default(DefaultValue::value("Release")),
        )
        .child(
            ConfigOption::string("generator")
                .describe("CMake generator.")
                .default(DefaultValue::env("CMAKE_GENERATOR")),
        )
        .child(
            ConfigOption::new(
                "args",
                OptionKind::List(ListStyle {
                    append_by_default: true,
                    singleton: false,
                }),
            )
            .describe("Extra arguments for the configure step.")
            .default(DefaultValue::value(toml::Value::Array(Vec::new()))),
        )
        .child(ConfigOption::new("options", OptionKind::CMakeOptions))
        .child(ConfigOption::new(
            "env",
            OptionKind::Dict {
                expand_environment: true,
            },
        ))
}

fn platform(name: &str) -> ConfigOption {
    ConfigOption::section(name)
        .create_if_inheritance_target_exists()
        .child(
            ConfigOption::section("cmake")
                .inherits(COMMON)
                .create_if_inheritance_target_exists(),
        )
}

pub fn schema() -> ConfigOption {
    let demo = ConfigOption::section("demo")
        .child(
            ConfigOption::string("name")
                .default(DefaultValue::reference("pyproject.toml/project/name")),
        )
        .child(cmake())
        .child(platform("linux"))
        .child(platform("windows"))
        .child(platform("mac"))
        .child(
            ConfigOption::section("cross")
                .child(ConfigOption::new(
                    "os",
                    OptionKind::Enum(vec!["linux".into(), "windows".into(), "mac".into()]),
                ))
                .child(ConfigOption::section("cmake").inherits(COMMON)),
        );
    ConfigOption::section("").child(
        ConfigOption::section(DOCUMENT)
            .child(ConfigOption::unchecked("project").child(ConfigOption::string("name")))
            .child(ConfigOption::section("tool").child(demo)),
    )
}

/// `cross/cmake` follows the platform named by `cross/os`.
pub fn cross() -> CrossInheritance {
    CrossInheritance {
        selector: ConfPath::parse("pyproject.toml/tool/demo/cross/os"),
        platforms: ConfPath::parse(TOOL),
        target: ConfPath::parse("pyproject.toml/tool/demo/cross"),
        sections: vec!["cmake".into()],
    }
}
