use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::{ready, Stream};
use pin_project_lite::pin_project;
use sha1::{Digest, Sha1};
use tracing::trace;

pin_project! {
    /// Passes a downloaded body through chunk by chunk while feeding it to checksum validators.
    ///  When the upstream body ends, every validator is checked, and a mismatch is reported as
    ///  one trailing error item. The stream ends after the first error.
    pub struct ValidatingHttpBody<B> {
        #[pin]
        http_body: B,
        validators: Vec<Box<dyn HttpBodyValidator>>,
        is_failed: bool,
    }
}
impl <B> ValidatingHttpBody<B> {
    pub fn new(http_body: B, validators: Vec<Box<dyn HttpBodyValidator>>) -> ValidatingHttpBody<B> {
        ValidatingHttpBody {
            http_body,
            validators,
            is_failed: false,
        }
    }
}

impl <B, E> Stream for ValidatingHttpBody<B>
where B: Stream<Item = Result<Bytes, E>>,
      E: Into<anyhow::Error>,
{
    type Item = anyhow::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.is_failed {
            return Poll::Ready(None);
        }

        let this = self.project();
        match ready!(this.http_body.poll_next(cx)) {
            Some(Ok(chunk)) => {
                this.validators.iter_mut()
                    .for_each(|v| v.update(&chunk));
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                *this.is_failed = true;
                Poll::Ready(Some(Err(e.into())))
            }
            None => {
                let mismatch = this.validators.iter()
                    .find(|v| !v.matches())
                    .map(|v| v.algorithm());

                match mismatch {
                    None => Poll::Ready(None),
                    Some(algorithm) => {
                        *this.is_failed = true;
                        Poll::Ready(Some(Err(anyhow::Error::msg(format!("{} checksum mismatch", algorithm)))))
                    }
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.http_body.size_hint()
    }
}

/// an incremental checksum over a body, compared against the value the server advertised
pub trait HttpBodyValidator: Send {
    fn algorithm(&self) -> &'static str;
    fn update(&mut self, chunk: &Bytes);
    fn matches(&self) -> bool;
}

pub struct Sha1HttpBodyValidator {
    hasher: Sha1,
    expected: [u8; 20],
}
impl Sha1HttpBodyValidator {
    pub fn new(expected: [u8; 20]) -> Sha1HttpBodyValidator {
        Sha1HttpBodyValidator {
            hasher: Sha1::new(),
            expected,
        }
    }
}
impl HttpBodyValidator for Sha1HttpBodyValidator {
    fn algorithm(&self) -> &'static str {
        "SHA1"
    }

    fn update(&mut self, chunk: &Bytes) {
        self.hasher.update(chunk);
    }

    fn matches(&self) -> bool {
        let actual: [u8; 20] = self.hasher.clone().finalize().into();
        trace!("SHA1 of body is {}", hex::encode(actual));
        actual == self.expected
    }
}

pub struct Md5HttpBodyValidator {
    context: md5::Context,
    expected: [u8; 16],
}
impl Md5HttpBodyValidator {
    pub fn new(expected: [u8; 16]) -> Md5HttpBodyValidator {
        Md5HttpBodyValidator {
            context: md5::Context::new(),
            expected,
        }
    }
}
impl HttpBodyValidator for Md5HttpBodyValidator {
    fn algorithm(&self) -> &'static str {
        "MD5"
    }

    fn update(&mut self, chunk: &Bytes) {
        self.context.consume(chunk);
    }

    fn matches(&self) -> bool {
        let actual: [u8; 16] = self.context.clone().compute().into();
        trace!("MD5 of body is {}", hex::encode(actual));
        actual == self.expected
    }
}
