use anyhow::{anyhow, Result};
use clap::builder::PossibleValue;
use clap::{crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches, Command};
use std::fs;

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn build_cli() -> Command {
    let mut args = vec![
        Arg::new("log-level")
            .long("log-level")
            .value_name("LOG_LEVEL")
            .env("LOG_LEVEL")
            .default_value("info")
            .value_parser(LOG_LEVELS.map(PossibleValue::new))
            .help("Log level"),
        Arg::new("log-fmt")
            .long("log-fmt")
            .value_name("LOG_FMT")
            .env("LOG_FMT")
            .default_value("text")
            .value_parser([PossibleValue::new("text"), PossibleValue::new("json")])
            .help("Log output format"),
        Arg::new("log-no-color")
            .long("log-no-color")
            .env("LOG_NO_COLOR")
            .action(ArgAction::SetTrue)
            .help("Disable colored output for logs"),
        Arg::new("address")
            .long("addr")
            .value_name("BIND_ADDRESS")
            .default_value("0.0.0.0")
            .env("BIND_ADDRESS")
            .help("Bind against ADDRESS"),
        Arg::new("port")
            .long("port")
            .value_name("PORT")
            .default_value("8443")
            .env("PORT")
            .help("Listen on PORT"),
        Arg::new("cert-file")
            .long("cert-file")
            .value_name("CERT_FILE")
            .default_value("")
            .env("TLS_CERT_FILE")
            .help("Path to an X.509 certificate file for HTTPS"),
        Arg::new("key-file")
            .long("key-file")
            .value_name("KEY_FILE")
            .default_value("")
            .env("TLS_KEY_FILE")
            .help("Path to an X.509 private key file for HTTPS"),
        Arg::new("registry")
            .long("registry")
            .value_name("REGISTRY")
            .env("REGISTRY")
            .help("Registry all the container images are rewritten to"),
        Arg::new("ignored-registries")
            .long("ignored-registries")
            .value_name("REGISTRIES")
            .env("IGNORED_REGISTRIES")
            .value_delimiter(',')
            .action(ArgAction::Append)
            .help("Comma separated list of registry prefixes whose images are never rewritten"),
        Arg::new("image-pull-secret")
            .long("image-pull-secret")
            .value_name("SECRET_NAME")
            .env("IMAGE_PULL_SECRET")
            .help("Name of the image pull secret injected into every pod"),
        Arg::new("append-image-pull-secret")
            .long("append-image-pull-secret")
            .env("APPEND_IMAGE_PULL_SECRET")
            .action(ArgAction::SetTrue)
            .help("Add the image pull secret next to the ones already referenced by the pod, instead of replacing them"),
        Arg::new("force-image-pull-policy")
            .long("force-image-pull-policy")
            .env("FORCE_IMAGE_PULL_POLICY")
            .action(ArgAction::SetTrue)
            .help("Force the image pull policy of every container"),
        Arg::new("image-pull-policy")
            .long("image-pull-policy")
            .value_name("POLICY")
            .env("IMAGE_PULL_POLICY_TO_FORCE")
            .default_value("Always")
            .value_parser([
                PossibleValue::new("Always"),
                PossibleValue::new("IfNotPresent"),
                PossibleValue::new("Never"),
            ])
            .help("Image pull policy enforced when --force-image-pull-policy is set"),
        Arg::new("default-storage-class")
            .long("default-storage-class")
            .value_name("STORAGE_CLASS")
            .env("DEFAULT_STORAGE_CLASS")
            .help("Storage class set on every PersistentVolumeClaim"),
        Arg::new("exclude-namespaces")
            .long("exclude-namespaces")
            .value_name("NAMESPACES")
            .env("EXCLUDE_NAMESPACES")
            .value_delimiter(',')
            .action(ArgAction::Append)
            .help("Comma separated list of namespaces whose objects are never mutated"),
    ];
    args.sort_by(|a, b| a.get_id().cmp(b.get_id()));

    Command::new(crate_name!())
        .author(crate_authors!())
        .version(crate_version!())
        .about(crate_description!())
        .args(args)
        .subcommand(
            Command::new("docs")
                .about("Generates the markdown documentation for the command line")
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_name("FILE")
                        .required(true)
                        .help("path where the documentation will be stored"),
                ),
        )
}

pub fn generate_docs(matches: &ArgMatches) -> Result<()> {
    let output = matches
        .get_one::<String>("output")
        .ok_or_else(|| anyhow!("missing output file"))?;
    let markdown = clap_markdown::help_markdown_command(&build_cli());

    fs::write(output, markdown).map_err(|e| anyhow!("cannot write documentation to {output}: {e}"))
}
