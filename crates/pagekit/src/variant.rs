//! Device-specific page variants.
//!
//! A base page or component type is declared as a trait. Concrete
//! implementations register themselves as [`Candidate`]s for that trait in a
//! [`VariantRegistry`], each carrying a [`VariantDescriptor`] (device type and
//! supported OS versions) and one or more constructors. At page construction
//! the registry picks the best candidate for the current device:
//!
//! 1. same device type listing the exact OS version
//! 2. same device type listing a version with the same major component
//! 3. same device type, any version
//! 4. same OS family
//!
//! Several candidates at the winning tier is an [`PageError::AmbiguousVariant`]
//! error. At the device-type tier a single unversioned candidate is preferred
//! over versioned ones.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::device::{major_version, DeviceDescriptor, DeviceType};
use crate::driver::Driver;
use crate::result::{PageError, PageResult};

/// Declared target of a candidate implementation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDescriptor {
    /// Implementation name
    pub name: String,
    /// Base type it implements
    pub parent: String,
    /// Device type it targets
    pub device_type: DeviceType,
    /// Supported OS versions, empty for any
    #[serde(default)]
    pub versions: Vec<String>,
}

impl VariantDescriptor {
    /// Describe an implementation of `parent` for `device_type`
    #[must_use]
    pub fn new(name: impl Into<String>, parent: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            name: name.into(),
            parent: parent.into(),
            device_type,
            versions: Vec::new(),
        }
    }

    /// Restrict to OS versions
    #[must_use]
    pub fn versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.versions = versions.into_iter().map(Into::into).collect();
        self
    }

    /// Whether no versions are declared
    #[must_use]
    pub fn is_unversioned(&self) -> bool {
        self.versions.is_empty()
    }

    /// Whether `version` is listed verbatim
    #[must_use]
    pub fn lists_version(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    /// Whether a listed version has major component `major`
    #[must_use]
    pub fn lists_major(&self, major: &str) -> bool {
        self.versions.iter().any(|v| major_version(v) == major)
    }
}

/// Precedence tier a selection was made at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    /// Device type and exact OS version
    ExactVersion,
    /// Device type and major OS version
    MajorVersion,
    /// Device type only
    DeviceType,
    /// OS family only
    OsFamily,
}

fn single(
    base_type: &str,
    device: &DeviceDescriptor,
    descriptors: &[&VariantDescriptor],
    matches: &[usize],
) -> PageResult<Option<usize>> {
    match matches {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        _ => Err(PageError::AmbiguousVariant {
            base_type: base_type.to_string(),
            device: device.to_string(),
            candidates: matches.iter().map(|&i| descriptors[i].name.clone()).collect(),
        }),
    }
}

/// Pick the candidate for `device` among `descriptors`.
///
/// Returns the index of the winner and the tier it matched at.
pub fn select_variant(
    base_type: &str,
    descriptors: &[&VariantDescriptor],
    device: &DeviceDescriptor,
) -> PageResult<(usize, MatchTier)> {
    let same_type: Vec<usize> = (0..descriptors.len())
        .filter(|&i| descriptors[i].device_type == device.device_type)
        .collect();
    let filtered = |pred: &dyn Fn(&VariantDescriptor) -> bool| -> Vec<usize> {
        same_type.iter().copied().filter(|&i| pred(descriptors[i])).collect()
    };

    let version = device.os_version.trim();
    if !version.is_empty() {
        let exact = filtered(&|d| d.lists_version(version));
        if let Some(i) = single(base_type, device, descriptors, &exact)? {
            return Ok((i, MatchTier::ExactVersion));
        }
    }

    let major = device.major_version();
    let by_major = filtered(&|d| d.lists_major(major));
    if let Some(i) = single(base_type, device, descriptors, &by_major)? {
        return Ok((i, MatchTier::MajorVersion));
    }

    if same_type.len() > 1 {
        let unversioned = filtered(&VariantDescriptor::is_unversioned);
        if let [only] = unversioned.as_slice() {
            return Ok((*only, MatchTier::DeviceType));
        }
    }
    if let Some(i) = single(base_type, device, descriptors, &same_type)? {
        return Ok((i, MatchTier::DeviceType));
    }

    let family: Vec<usize> = (0..descriptors.len())
        .filter(|&i| descriptors[i].device_type.os_family() == device.os_family())
        .collect();
    if let Some(i) = single(base_type, device, descriptors, &family)? {
        return Ok((i, MatchTier::OsFamily));
    }

    Err(PageError::NoMatchingVariant {
        base_type: base_type.to_string(),
        device: device.to_string(),
    })
}

/// Kind of a constructor parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Boolean
    Bool,
    /// Integer, accepts any integer width
    Int,
    /// Floating point, accepts `f32` and `f64`
    Float,
    /// String
    Str,
    /// Automation driver
    Driver,
    /// Any other type, by type name
    Opaque(&'static str),
}

impl ParamKind {
    /// Parameter of type `T`
    #[must_use]
    pub fn opaque<T: Any>() -> Self {
        Self::Opaque(type_name::<T>())
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Driver => f.write_str("driver"),
            Self::Opaque(name) => f.write_str(name),
        }
    }
}

/// A construction argument
#[derive(Clone)]
pub enum ArgValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    Str(String),
    /// Automation driver
    Driver(Arc<dyn Driver>),
    /// Any other value
    Opaque {
        /// Type name of the value
        type_name: &'static str,
        /// The value
        value: Arc<dyn Any + Send + Sync>,
    },
}

fn opaque_int(value: &(dyn Any + Send + Sync)) -> Option<i64> {
    if let Some(v) = value.downcast_ref::<i32>() {
        return Some(i64::from(*v));
    }
    if let Some(v) = value.downcast_ref::<i64>() {
        return Some(*v);
    }
    if let Some(v) = value.downcast_ref::<u32>() {
        return Some(i64::from(*v));
    }
    if let Some(v) = value.downcast_ref::<u64>() {
        return i64::try_from(*v).ok();
    }
    if let Some(v) = value.downcast_ref::<usize>() {
        return i64::try_from(*v).ok();
    }
    value
        .downcast_ref::<isize>()
        .and_then(|v| i64::try_from(*v).ok())
}

fn opaque_float(value: &(dyn Any + Send + Sync)) -> Option<f64> {
    if let Some(v) = value.downcast_ref::<f32>() {
        return Some(f64::from(*v));
    }
    value.downcast_ref::<f64>().copied()
}

impl ArgValue {
    /// Wrap any value
    #[must_use]
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self::Opaque {
            type_name: type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// Kind of this argument
    #[must_use]
    pub const fn kind(&self) -> ParamKind {
        match self {
            Self::Bool(_) => ParamKind::Bool,
            Self::Int(_) => ParamKind::Int,
            Self::Float(_) => ParamKind::Float,
            Self::Str(_) => ParamKind::Str,
            Self::Driver(_) => ParamKind::Driver,
            Self::Opaque { type_name, .. } => ParamKind::Opaque(*type_name),
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Opaque { value, .. } => opaque_int(value.as_ref()),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Opaque { value, .. } => opaque_float(value.as_ref()),
            _ => None,
        }
    }

    /// 2 for an identical kind, 1 for a compatible one
    fn score(&self, param: ParamKind) -> Option<u32> {
        if self.kind() == param {
            return Some(2);
        }
        let compatible = match param {
            ParamKind::Int => self.as_int().is_some(),
            ParamKind::Float => self.as_float().is_some(),
            _ => false,
        };
        compatible.then_some(1)
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Str(v) => write!(f, "Str({v:?})"),
            Self::Driver(_) => f.write_str("Driver(..)"),
            Self::Opaque { type_name, .. } => write!(f, "Opaque({type_name})"),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Arc<dyn Driver>> for ArgValue {
    fn from(v: Arc<dyn Driver>) -> Self {
        Self::Driver(v)
    }
}

/// Positional arguments for a variant constructor
#[derive(Debug, Clone, Default)]
pub struct ConstructArgs {
    values: Vec<ArgValue>,
}

impl ConstructArgs {
    /// No arguments
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument
    #[must_use]
    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Number of arguments
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no arguments
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Kinds of the arguments, in order
    #[must_use]
    pub fn kinds(&self) -> Vec<ParamKind> {
        self.values.iter().map(ArgValue::kind).collect()
    }

    /// Raw argument at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.values.get(index)
    }

    fn mismatch(&self, index: usize, expected: &str) -> PageError {
        let found = self
            .get(index)
            .map_or_else(|| "nothing".to_string(), |v| v.kind().to_string());
        PageError::UnsupportedOperation {
            message: format!("argument {index} is {found}, expected {expected}"),
        }
    }

    /// Boolean argument
    pub fn bool(&self, index: usize) -> PageResult<bool> {
        match self.get(index) {
            Some(ArgValue::Bool(v)) => Ok(*v),
            _ => Err(self.mismatch(index, "bool")),
        }
    }

    /// Integer argument, widened to `i64`
    pub fn int(&self, index: usize) -> PageResult<i64> {
        self.get(index)
            .and_then(ArgValue::as_int)
            .ok_or_else(|| self.mismatch(index, "int"))
    }

    /// Float argument, widened to `f64`
    pub fn float(&self, index: usize) -> PageResult<f64> {
        self.get(index)
            .and_then(ArgValue::as_float)
            .ok_or_else(|| self.mismatch(index, "float"))
    }

    /// String argument
    pub fn str(&self, index: usize) -> PageResult<&str> {
        match self.get(index) {
            Some(ArgValue::Str(v)) => Ok(v),
            _ => Err(self.mismatch(index, "str")),
        }
    }

    /// Driver argument
    pub fn driver(&self, index: usize) -> PageResult<Arc<dyn Driver>> {
        match self.get(index) {
            Some(ArgValue::Driver(v)) => Ok(v.clone()),
            _ => Err(self.mismatch(index, "driver")),
        }
    }

    /// Opaque argument of type `T`
    pub fn opaque<T: Any>(&self, index: usize) -> PageResult<&T> {
        match self.get(index) {
            Some(ArgValue::Opaque { value, .. }) => value
                .downcast_ref::<T>()
                .ok_or_else(|| self.mismatch(index, type_name::<T>())),
            _ => Err(self.mismatch(index, type_name::<T>())),
        }
    }
}

type BuildFn<B> = dyn Fn(&ConstructArgs) -> PageResult<Box<B>> + Send + Sync;

/// One way of constructing a candidate
pub struct Constructor<B: ?Sized> {
    params: Vec<ParamKind>,
    build: Arc<BuildFn<B>>,
}

impl<B: ?Sized> Constructor<B> {
    /// Constructor taking `params`
    pub fn new<F>(params: impl Into<Vec<ParamKind>>, build: F) -> Self
    where
        F: Fn(&ConstructArgs) -> PageResult<Box<B>> + Send + Sync + 'static,
    {
        Self {
            params: params.into(),
            build: Arc::new(build),
        }
    }

    /// Parameter kinds
    #[must_use]
    pub fn params(&self) -> &[ParamKind] {
        &self.params
    }

    /// Match score for `args`, `None` when they do not fit
    #[must_use]
    pub fn score(&self, args: &ConstructArgs) -> Option<u32> {
        if self.params.len() != args.len() {
            return None;
        }
        self.params
            .iter()
            .zip(&args.values)
            .map(|(param, arg)| arg.score(*param))
            .sum()
    }
}

impl<B: ?Sized> Clone for Constructor<B> {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            build: self.build.clone(),
        }
    }
}

impl<B: ?Sized> fmt::Debug for Constructor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A registered implementation of base type `B`
pub struct Candidate<B: ?Sized> {
    descriptor: VariantDescriptor,
    constructors: Vec<Constructor<B>>,
}

impl<B: ?Sized> Candidate<B> {
    /// Candidate without constructors yet
    #[must_use]
    pub const fn new(descriptor: VariantDescriptor) -> Self {
        Self {
            descriptor,
            constructors: Vec::new(),
        }
    }

    /// Add a constructor
    #[must_use]
    pub fn constructor<F>(mut self, params: impl Into<Vec<ParamKind>>, build: F) -> Self
    where
        F: Fn(&ConstructArgs) -> PageResult<Box<B>> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor::new(params, build));
        self
    }

    /// Declared target
    #[must_use]
    pub const fn descriptor(&self) -> &VariantDescriptor {
        &self.descriptor
    }

    /// Registered constructors
    #[must_use]
    pub fn constructors(&self) -> &[Constructor<B>] {
        &self.constructors
    }

    /// Best constructor for `args`; the first registered wins a tie
    pub fn find_constructor(&self, args: &ConstructArgs) -> PageResult<&Constructor<B>> {
        let mut best: Option<(u32, &Constructor<B>)> = None;
        for ctor in &self.constructors {
            if let Some(score) = ctor.score(args) {
                if best.map_or(true, |(s, _)| score > s) {
                    best = Some((score, ctor));
                }
            }
        }
        best.map(|(_, ctor)| ctor)
            .ok_or_else(|| PageError::ConstructorNotFound {
                variant: self.descriptor.name.clone(),
                args: args.kinds().iter().map(ToString::to_string).collect(),
            })
    }

    /// Construct through the best matching constructor
    pub fn instantiate(&self, args: &ConstructArgs) -> PageResult<Box<B>> {
        let ctor = self.find_constructor(args)?;
        (ctor.build)(args)
    }
}

impl<B: ?Sized> fmt::Debug for Candidate<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("descriptor", &self.descriptor)
            .field("constructors", &self.constructors)
            .finish()
    }
}

/// Candidates keyed by base type
#[derive(Default)]
pub struct VariantRegistry {
    bases: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl VariantRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a candidate for base type `B`
    pub fn register<B: ?Sized + 'static>(&mut self, candidate: Candidate<B>) -> &mut Self {
        tracing::debug!(
            base = type_name::<B>(),
            variant = %candidate.descriptor.name,
            device = %candidate.descriptor.device_type,
            "registering variant"
        );
        let entry = self
            .bases
            .entry(TypeId::of::<B>())
            .or_insert_with(|| Box::new(Vec::<Candidate<B>>::new()));
        if let Some(list) = entry.downcast_mut::<Vec<Candidate<B>>>() {
            list.push(candidate);
        }
        self
    }

    /// Builder form of [`VariantRegistry::register`]
    #[must_use]
    pub fn with<B: ?Sized + 'static>(mut self, candidate: Candidate<B>) -> Self {
        self.register(candidate);
        self
    }

    /// Candidates registered for `B`, in registration order
    #[must_use]
    pub fn candidates<B: ?Sized + 'static>(&self) -> &[Candidate<B>] {
        self.bases
            .get(&TypeId::of::<B>())
            .and_then(|list| list.downcast_ref::<Vec<Candidate<B>>>())
            .map_or(&[], Vec::as_slice)
    }

    /// Number of base types with candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Candidate of `B` best matching `device`
    pub fn select<B: ?Sized + 'static>(&self, device: &DeviceDescriptor) -> PageResult<&Candidate<B>> {
        let candidates = self.candidates::<B>();
        let descriptors: Vec<&VariantDescriptor> =
            candidates.iter().map(Candidate::descriptor).collect();
        let (index, tier) = select_variant(type_name::<B>(), &descriptors, device)?;
        let chosen = &candidates[index];
        tracing::debug!(
            base = type_name::<B>(),
            %device,
            variant = %chosen.descriptor.name,
            ?tier,
            "variant selected"
        );
        Ok(chosen)
    }

    /// Select the variant of `B` for `device` and construct it from `args`
    pub fn instantiate<B: ?Sized + 'static>(
        &self,
        device: &DeviceDescriptor,
        args: &ConstructArgs,
    ) -> PageResult<Box<B>> {
        self.select::<B>(device)?.instantiate(args)
    }
}

impl fmt::Debug for VariantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantRegistry")
            .field("bases", &self.bases.len())
            .finish()
    }
}

static GLOBAL_REGISTRY: OnceLock<VariantRegistry> = OnceLock::new();

/// Install the process-wide registry; it can only be installed once
pub fn install_global(registry: VariantRegistry) -> PageResult<()> {
    GLOBAL_REGISTRY
        .set(registry)
        .map_err(|_| PageError::UnsupportedOperation {
            message: "global variant registry is already installed".to_string(),
        })
}

/// The process-wide registry, if installed
#[must_use]
pub fn global() -> Option<&'static VariantRegistry> {
    GLOBAL_REGISTRY.get()
}
