//! The bundled `elm/core` package
//!
//! A trimmed copy of the core library, enough to type real programs. Values
//! implemented by the runtime point at `Elm.Kernel.*` and are checked
//! against their annotations only.

/// Package name the core modules are registered under
pub const PACKAGE: &str = "elm/core";

/// `(uri, source)` of every bundled module
pub const MODULES: &[(&str, &str)] = &[
    ("elm-core://Basics.elm", include_str!("elm/Basics.elm")),
    ("elm-core://List.elm", include_str!("elm/List.elm")),
    ("elm-core://Maybe.elm", include_str!("elm/Maybe.elm")),
    ("elm-core://Result.elm", include_str!("elm/Result.elm")),
    ("elm-core://String.elm", include_str!("elm/String.elm")),
    ("elm-core://Char.elm", include_str!("elm/Char.elm")),
    ("elm-core://Tuple.elm", include_str!("elm/Tuple.elm")),
    ("elm-core://Debug.elm", include_str!("elm/Debug.elm")),
    ("elm-core://Platform.elm", include_str!("elm/Platform.elm")),
    ("elm-core://Platform/Cmd.elm", include_str!("elm/Platform/Cmd.elm")),
    ("elm-core://Platform/Sub.elm", include_str!("elm/Platform/Sub.elm")),
];

/// Default imports every module sees before its own
pub const DEFAULT_IMPORTS: &str = "\
import Basics exposing (..)
import List exposing (List, (::))
import Maybe exposing (Maybe(..))
import Result exposing (Result(..))
import String exposing (String)
import Char exposing (Char)
import Tuple
import Debug
import Platform exposing (Program)
import Platform.Cmd as Cmd exposing (Cmd)
import Platform.Sub as Sub exposing (Sub)
";

/// Qualifier prefix of runtime-implemented values
pub const KERNEL_PREFIX: &str = "Elm.Kernel.";
