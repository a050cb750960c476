use anyhow::{ensure, Context, Result};
use bbox::{CyCxHW, CyCxHW_, Transform};
use num_traits::Num;

/// A box annotated with its class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label<R, C> {
    pub rect: R,
    pub class: C,
}

impl<T, C> Label<CyCxHW<T>, C>
where
    T: Copy + Num + PartialOrd,
    C: Copy,
{
    pub fn try_transform(&self, transform: &Transform<T>) -> Result<Self> {
        Ok(Label {
            rect: self.rect.try_transform(transform)?,
            class: self.class,
        })
    }
}

/// The annotated instances of one image, in annotation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLabels<T, C> {
    labels: Vec<Label<CyCxHW<T>, C>>,
}

impl<T, C> ImageLabels<T, C>
where
    T: Copy + Num + PartialOrd,
    C: Copy,
{
    pub fn new(labels: Vec<Label<CyCxHW<T>, C>>) -> Self {
        Self { labels }
    }

    /// Build from a box list of shape `[B, 4]` in `[cx, cy, w, h]` order and
    /// a parallel class list of length `B`.
    pub fn try_from_parallel<B>(boxes: &[B], classes: &[C]) -> Result<Self>
    where
        B: AsRef<[T]>,
    {
        ensure!(
            boxes.len() == classes.len(),
            "the number of boxes ({}) and classes ({}) must agree",
            boxes.len(),
            classes.len()
        );

        let labels: Vec<_> = boxes
            .iter()
            .zip(classes)
            .enumerate()
            .map(|(index, (values, &class))| -> Result<_> {
                let rect: CyCxHW<T> = CyCxHW_::from_cxcywh_slice(values.as_ref())
                    .and_then(CyCxHW::try_from)
                    .with_context(|| format!("invalid box at index {}", index))?;
                Ok(Label { rect, class })
            })
            .collect::<Result<_>>()?;

        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[Label<CyCxHW<T>, C>] {
        &self.labels
    }

    pub fn boxes(&self) -> impl Iterator<Item = &CyCxHW<T>> + '_ {
        self.labels.iter().map(|label| &label.rect)
    }

    pub fn classes(&self) -> impl Iterator<Item = C> + '_ {
        self.labels.iter().map(|label| label.class)
    }

    /// Apply a fallible per-box map, keeping the classes.
    pub fn try_map_boxes<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&CyCxHW<T>) -> Result<CyCxHW<T>>,
    {
        let labels: Vec<_> = self
            .labels
            .iter()
            .map(|label| -> Result<_> {
                Ok(Label {
                    rect: f(&label.rect)?,
                    class: label.class,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { labels })
    }

    pub fn try_transform(&self, transform: &Transform<T>) -> Result<Self> {
        self.try_map_boxes(|rect| rect.try_transform(transform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use bbox::RectNum;

    #[test]
    fn parallel_lists() {
        let boxes = vec![vec![0.5, 0.5, 0.1, 0.2], vec![0.2, 0.3, 0.05, 0.05]];
        let labels = ImageLabels::try_from_parallel(&boxes, &[3i64, 7]).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.classes().collect::<Vec<_>>(), vec![3, 7]);
        assert_eq!(
            labels.boxes().next().unwrap().cxcywh(),
            [0.5, 0.5, 0.1, 0.2]
        );
    }

    #[test]
    fn reject_malformed_lists() {
        let boxes = vec![vec![0.5, 0.5, 0.1, 0.2]];
        assert!(ImageLabels::try_from_parallel(&boxes, &[1i64, 2]).is_err());

        let boxes = vec![vec![0.5, 0.5, 0.1]];
        assert!(ImageLabels::try_from_parallel(&boxes, &[1i64]).is_err());

        let boxes = vec![vec![0.5, 0.5, 0.1, -0.2]];
        assert!(ImageLabels::try_from_parallel(&boxes, &[1i64]).is_err());
    }

    #[test]
    fn empty_image() {
        let boxes: Vec<[f64; 4]> = vec![];
        let labels = ImageLabels::<f64, i64>::try_from_parallel(&boxes, &[]).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn translate_labels() {
        let boxes = vec![[0.5, 0.5, 0.1, 0.2]];
        let labels = ImageLabels::try_from_parallel(&boxes, &[0i64]).unwrap();
        let moved = labels
            .try_transform(&Transform::translation(0.1, -0.1))
            .unwrap();
        let [cx, cy, w, h] = moved.boxes().next().unwrap().cxcywh();
        assert_abs_diff_eq!(cx, 0.4);
        assert_abs_diff_eq!(cy, 0.6);
        assert_abs_diff_eq!(w, 0.1);
        assert_abs_diff_eq!(h, 0.2);
        assert_eq!(moved.labels()[0].class, 0);
    }
}
