// Generates man pages and shell completions for `xapbus` into $OUT_DIR.
//
// Pages are named after the git-style path of each subcommand
// (`xapbus-channels-set.1`); completions land in `$OUT_DIR/completions`.

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::Shell;

#[path = "src/cli.rs"]
mod cli;

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = std::env::var_os("OUT_DIR")
        .map(std::path::PathBuf::from)
        .ok_or_else(|| io::Error::other("OUT_DIR is only set when run by cargo"))?;

    let mut cmd = cli::Cli::command();
    cmd.build();

    write_man_pages(&cmd, &out_dir.join("man"))?;
    write_completions(&mut cmd, &out_dir.join("completions"))
}

fn write_man_pages(root: &clap::Command, dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;

    let mut pending = vec![(root.get_name().to_owned(), root.clone())];
    while let Some((page, cmd)) = pending.pop() {
        pending.extend(
            cmd.get_subcommands()
                .filter(|sub| !sub.is_hide_set())
                .map(|sub| {
                    let name = format!("{page}-{}", sub.get_name());
                    (name.clone(), sub.clone().name(name))
                }),
        );

        let mut roff = Vec::new();
        clap_mangen::Man::new(cmd).render(&mut roff)?;
        std::fs::write(dir.join(format!("{page}.1")), roff)?;
    }
    Ok(())
}

fn write_completions(cmd: &mut clap::Command, dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        clap_complete::generate_to(shell, cmd, "xapbus", dir)?;
    }
    Ok(())
}
