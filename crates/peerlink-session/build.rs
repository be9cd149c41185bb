//! Compiles the libtorrent bridge when the `libtorrent` feature is enabled.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    #[cfg(feature = "libtorrent")]
    if let Err(err) = native::build() {
        eprintln!("peerlink-session: {err}");
        std::process::exit(1);
    }
}

#[cfg(feature = "libtorrent")]
mod native {
    use std::env;
    use std::error::Error;
    use std::fmt;
    use std::fs;
    use std::path::{Path, PathBuf};

    const MIN_VERSION: (u32, u32, u32) = (2, 0, 10);
    const LIBRARY: &str = "torrent-rasterbar";
    const BRIDGE: &str = "src/ffi/bridge.rs";
    const SOURCE: &str = "src/ffi/session.cpp";
    const HEADER: &str = "src/ffi/include/peerlink/session.hpp";
    const ENV_VARS: [&str; 3] = [
        "LIBTORRENT_INCLUDE_DIR",
        "LIBTORRENT_LIB_DIR",
        "LIBTORRENT_BUNDLE_DIR",
    ];

    enum Discovery {
        Paths { include: PathBuf, lib: PathBuf },
        PkgConfig { include: Vec<PathBuf> },
    }

    pub(super) fn build() -> Result<(), BuildError> {
        for var in ENV_VARS {
            println!("cargo:rerun-if-env-changed={var}");
        }

        let mut bridge = cxx_build::bridge(BRIDGE);
        bridge
            .file(SOURCE)
            .include("src/ffi/include")
            .flag_if_supported("-std=c++17");

        match discover()? {
            Discovery::Paths { include, lib } => {
                check_header_version(&include)?;
                bridge.include(&include);
                println!("cargo:rustc-link-search=native={}", lib.display());
                println!("cargo:rustc-link-lib={LIBRARY}");
            }
            Discovery::PkgConfig { include } => {
                for path in include {
                    bridge.include(path);
                }
            }
        }

        bridge.compile("peerlink-libtorrent");
        for path in [BRIDGE, SOURCE, HEADER] {
            println!("cargo:rerun-if-changed={path}");
        }
        Ok(())
    }

    fn discover() -> Result<Discovery, BuildError> {
        if let Some(root) = env::var_os("LIBTORRENT_BUNDLE_DIR").map(PathBuf::from) {
            let include = root.join("include");
            let lib = root.join("lib");
            if include.join("libtorrent").exists() && lib.exists() {
                return Ok(Discovery::Paths { include, lib });
            }
        }

        let include = env::var_os("LIBTORRENT_INCLUDE_DIR").map(PathBuf::from);
        let lib = env::var_os("LIBTORRENT_LIB_DIR").map(PathBuf::from);
        match (include, lib) {
            (Some(include), Some(lib)) => Ok(Discovery::Paths { include, lib }),
            (None, Some(_)) => Err(BuildError::MissingIncludeDir),
            (include, None) => {
                let (major, minor, tiny) = MIN_VERSION;
                let library = pkg_config::Config::new()
                    .atleast_version(&format!("{major}.{minor}.{tiny}"))
                    .probe("libtorrent-rasterbar")
                    .map_err(BuildError::PkgConfig)?;
                let mut paths = library.include_paths;
                if let Some(include) = include {
                    check_header_version(&include)?;
                    paths.insert(0, include);
                }
                Ok(Discovery::PkgConfig { include: paths })
            }
        }
    }

    fn check_header_version(include_dir: &Path) -> Result<(), BuildError> {
        let header = include_dir.join("libtorrent").join("version.hpp");
        let contents = fs::read_to_string(&header).map_err(BuildError::ReadHeader)?;
        let found = (
            define(&contents, "LIBTORRENT_VERSION_MAJOR")?,
            define(&contents, "LIBTORRENT_VERSION_MINOR")?,
            define(&contents, "LIBTORRENT_VERSION_TINY")?,
        );
        if found < MIN_VERSION {
            return Err(BuildError::VersionTooOld { found });
        }
        Ok(())
    }

    fn define(contents: &str, name: &'static str) -> Result<u32, BuildError> {
        contents
            .lines()
            .filter_map(|line| line.trim_start().strip_prefix("#define"))
            .find_map(|rest| {
                let mut parts = rest.split_whitespace();
                (parts.next() == Some(name))
                    .then(|| parts.next().and_then(|value| value.parse().ok()))
                    .flatten()
            })
            .ok_or(BuildError::MissingDefine(name))
    }

    #[derive(Debug)]
    pub(super) enum BuildError {
        MissingIncludeDir,
        PkgConfig(pkg_config::Error),
        ReadHeader(std::io::Error),
        MissingDefine(&'static str),
        VersionTooOld { found: (u32, u32, u32) },
    }

    impl fmt::Display for BuildError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::MissingIncludeDir => {
                    f.write_str("LIBTORRENT_LIB_DIR requires LIBTORRENT_INCLUDE_DIR")
                }
                Self::PkgConfig(_) => f.write_str("libtorrent pkg-config probe failed"),
                Self::ReadHeader(_) => f.write_str("libtorrent version header read failed"),
                Self::MissingDefine(name) => {
                    write!(f, "libtorrent version header is missing {name}")
                }
                Self::VersionTooOld { found } => {
                    let (major, minor, tiny) = MIN_VERSION;
                    write!(
                        f,
                        "libtorrent {}.{}.{} is older than {major}.{minor}.{tiny}",
                        found.0, found.1, found.2
                    )
                }
            }
        }
    }

    impl Error for BuildError {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            match self {
                Self::PkgConfig(err) => Some(err),
                Self::ReadHeader(err) => Some(err),
                _ => None,
            }
        }
    }
}
