pub(super) const ROOT_LONG_ABOUT: &str = "\
Content-hash integrity checks for mirrored directory trees

MirrorGuard verifies that a mirror or backup of a directory tree is byte-identical
to a reference state. It compares SHA-256 digests of file contents, never timestamps,
so copies that preserve content but not mtimes still verify cleanly, and silent
corruption is caught even when size and mtime look right.

CORE CONCEPTS:

  Manifest:
    A plain text file with one line per file: '<sha256 hex> *<path>'. This is the
    same layout 'sha256sum --binary' produces. Paths are relative to the source
    directory they were found in. Manifests are always written to a temporary file
    and renamed into place, so a reader never sees a partial manifest.

  Policy:
    Filters shared by every command that walks a tree: include/exclude substring
    patterns, hidden-file suppression, symlink following and recursion. Defaults
    can be kept in a TOML file passed with --config.

COMMANDS:

  generate <SOURCE>... <MANIFEST>
    Hash every file under the source directories into one manifest.

  verify <MIRROR> <MANIFEST>
    Hash every file the manifest lists inside the mirror and report missing,
    corrupt and unreadable files, plus files the manifest does not mention.

  compare <MANIFEST_A> <MANIFEST_B>
    Compare two manifests without touching the filesystem.

  diff <DIR_A> <DIR_B>
    Hash two trees and compare them directly.

EXIT CODES:

  0  Success (verify passed, compare/diff found no differences)
  1  General error, or compare/diff found differences
  2  Invalid arguments
  3  File I/O error
  4  Too many files (catalog limit reached)
  5  Verification failed
  6  Interrupted (SIGINT/SIGTERM)
  7  Invalid format (e.g. a path longer than 4096 bytes)
  8  Conflicting options

LOGGING:

  Logs go to stderr (or to --log-file), results go to stdout.
  -v shows info, -vv shows debug, -q shows only errors, --log-level picks a level.
  Without any of these, RUST_LOG is honored and the default level is warn.

EXAMPLES:

  # Record the state of a tree
  $ mirrorguard generate /srv/data data.sha256

  # Check a copy against it
  $ mirrorguard verify /mnt/backup/data data.sha256

  # Which files changed between two snapshots?
  $ mirrorguard compare monday.sha256 tuesday.sha256

  # Compare two trees directly, ignoring editor droppings
  $ mirrorguard diff -x .swp -x '~' ./site /var/www/site
";

pub(super) const GENERATE_LONG_ABOUT: &str = "\
Hash one or more source trees into a manifest

Walks every source directory in order and hashes each selected regular file. The
resulting manifest is sorted by path, so running generate twice over an unchanged
tree yields identical manifests.

BEHAVIOR:

  - Paths are written relative to the source directory they were found in.
  - The manifest is written to '<MANIFEST>.tmp.<pid>' next to the destination, synced,
    and renamed over the destination. On any failure, or on interruption, the
    temporary file is removed and an existing manifest is left untouched.
  - If the manifest lives inside a source tree it is not listed in itself.
  - Unreadable files and subdirectories are logged and skipped. An unreadable source
    directory aborts the run.
  - If no files are selected, nothing is written and the exit code is 1.

SYMLINKS:

  Symlinks are skipped unless --follow-symlinks is given. When following, only links
  to regular files are hashed, under the path of their resolved target; links to
  directories are never entered, so link cycles cannot trap the walk.

EXAMPLES:

  # One source
  $ mirrorguard generate ./photos photos.sha256

  # Several sources into one manifest, skipping dotfiles
  $ mirrorguard generate --no-hidden ./etc ./home home-and-etc.sha256

  # See what would be hashed without writing anything
  $ mirrorguard -v generate --dry-run ./photos photos.sha256
";

pub(super) const VERIFY_LONG_ABOUT: &str = "\
Check a mirror tree against a manifest

Each manifest line is resolved under MIRROR and classified:

  VALID    The file exists and its digest matches
  MISSING  The file does not exist                                  (M)
  CORRUPT  The file exists but its digest differs                   (C)
  ERROR    The path is not a regular file or could not be read     (E)
  EXTRA    A mirror file that no manifest line mentions             (+)

Non-valid entries are printed to stdout with the code shown in parentheses, followed
by a summary. The run fails with exit code 5 if any entry is missing, corrupt or an
error. Extra files are reported but do not fail the run.

BEHAVIOR:

  - Manifest lines that are not '<64 hex digits> *<path>' are skipped.
  - Lines whose path contains '..' segments are rejected without touching the
    filesystem and counted separately.
  - Include/exclude and hidden-file filters apply to manifest paths in the same way
    they apply to a scan of the mirror.
  - The manifest file itself is never reported as extra.
  - Use --no-extra-check to skip the listing of the mirror.
";

pub(super) const COMPARE_LONG_ABOUT: &str = "\
Compare two manifests

Both manifests are read, sorted by path and merged. Each path is reported as the same,
different (! in the output), only in A (<) or only in B (>). Exits with 0 if the
manifests describe identical contents and 1 otherwise.

Duplicate paths are not merged: each copy pairs with at most one entry on the other
side.
";

pub(super) const DIFF_LONG_ABOUT: &str = "\
Hash two directory trees and compare them

Equivalent to generating a manifest for each directory and comparing them, without
writing anything. Paths are compared relative to DIR_A and DIR_B. Exits with 0 if
the trees have identical contents and 1 otherwise.
";
